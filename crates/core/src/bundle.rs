//! Bundles: composing multi-resource writes and decomposing responses

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::addressing::save;
use crate::error::ExtractionError;
use crate::request::{
    HttpMethod, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_EXIST, IF_NONE_MATCH, RequestDescriptor,
};
use crate::resource::{Reference, Resource};

/// FHIR Bundle types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Searchset,
    History,
    Collection,
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
}

fn bundle_resource_type() -> String {
    "Bundle".to_string()
}

/// FHIR Bundle resource.
///
/// Response bundles carry typed [`Resource`]s; bundles composed for sending
/// carry the cleaned JSON bodies (`Bundle<JsonValue>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "R: Deserialize<'de>"))]
pub struct Bundle<R = Resource> {
    #[serde(default = "bundle_resource_type")]
    pub resource_type: String,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry<R>>,
}

impl<R> Bundle<R> {
    pub fn new(bundle_type: BundleType, entry: Vec<BundleEntry<R>>) -> Self {
        Self {
            resource_type: bundle_resource_type(),
            bundle_type,
            total: None,
            link: Vec::new(),
            entry,
        }
    }

    /// Search result page
    pub fn searchset(total: u32, entry: Vec<BundleEntry<R>>) -> Self {
        Self {
            total: Some(total),
            ..Self::new(BundleType::Searchset, entry)
        }
    }

    pub fn with_link(mut self, relation: &str, url: &str) -> Self {
        self.link.push(BundleLink {
            relation: relation.to_string(),
            url: url.to_string(),
        });
        self
    }

    pub fn link(&self, relation: &str) -> Option<&BundleLink> {
        self.link.iter().find(|link| link.relation == relation)
    }

    pub fn has_link(&self, relation: &str) -> bool {
        self.link(relation).is_some()
    }

    pub fn resources(&self) -> impl Iterator<Item = &R> {
        self.entry.iter().filter_map(|entry| entry.resource.as_ref())
    }
}

/// Pagination / navigation link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "R: Deserialize<'de>"))]
pub struct BundleEntry<R = Resource> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<R>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<BundleEntryRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<BundleEntryResponse>,
}

impl<R> BundleEntry<R> {
    pub fn new(full_url: Option<String>, resource: R) -> Self {
        Self {
            full_url,
            resource: Some(resource),
            request: None,
            response: None,
        }
    }

    fn for_request(resource: Option<R>, request: BundleEntryRequest) -> Self {
        Self {
            full_url: None,
            resource,
            request: Some(request),
            response: None,
        }
    }
}

/// Request carried by a transaction/batch entry.
///
/// Conditional headers are expressed as fields here, not as HTTP headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntryRequest {
    pub method: HttpMethod,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_match: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_none_exist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_modified_since: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_none_match: Option<String>,
}

impl BundleEntryRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            if_match: None,
            if_none_exist: None,
            if_modified_since: None,
            if_none_match: None,
        }
    }
}

/// Per-entry outcome in a transaction/batch response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntryResponse {
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JsonValue>,
}

// ---------------------------------------------------------------------------
// Compose
// ---------------------------------------------------------------------------

/// Entry that saves one resource: same method/url as a standalone save, with
/// the version carried as `ifMatch`.
pub fn save_entry(resource: &Resource) -> BundleEntry<JsonValue> {
    let standalone = save(resource);
    let mut request = BundleEntryRequest::new(standalone.method, standalone.url.clone());
    request.if_match = standalone.header(IF_MATCH).map(str::to_string);

    BundleEntry::for_request(standalone.data, request)
}

/// Bundle saving every resource, in order
pub fn bundle_of_resources(resources: &[Resource], bundle_type: BundleType) -> Bundle<JsonValue> {
    Bundle::new(bundle_type, resources.iter().map(save_entry).collect())
}

/// Re-express a standalone request as a bundle entry.
///
/// Query params move into the entry URL, conditional headers become the
/// matching `request` fields and the body becomes the entry resource.
pub fn transform_to_bundle_entry(descriptor: &RequestDescriptor) -> BundleEntry<JsonValue> {
    let mut request = BundleEntryRequest::new(descriptor.method, descriptor.url_with_query());
    request.if_modified_since = descriptor.header(IF_MODIFIED_SINCE).map(str::to_string);
    request.if_match = descriptor.header(IF_MATCH).map(str::to_string);
    request.if_none_match = descriptor.header(IF_NONE_MATCH).map(str::to_string);
    request.if_none_exist = descriptor.header(IF_NONE_EXIST).map(str::to_string);

    BundleEntry::for_request(descriptor.data.clone(), request)
}

pub fn bundle_of_requests(
    requests: &[RequestDescriptor],
    bundle_type: BundleType,
) -> Bundle<JsonValue> {
    Bundle::new(
        bundle_type,
        requests.iter().map(transform_to_bundle_entry).collect(),
    )
}

fn post_bundle(bundle: &Bundle<JsonValue>) -> RequestDescriptor {
    // Bundle holds only strings, enums and JSON values, so serialization cannot fail.
    let data = serde_json::to_value(bundle).unwrap_or(JsonValue::Null);
    RequestDescriptor::new(HttpMethod::Post, "/").with_data(data)
}

/// `POST /` saving all resources in one transaction or batch
pub fn save_many(resources: &[Resource], bundle_type: BundleType) -> RequestDescriptor {
    post_bundle(&bundle_of_resources(resources, bundle_type))
}

/// `POST /` applying all requests in one transaction or batch
pub fn apply_many(requests: &[RequestDescriptor], bundle_type: BundleType) -> RequestDescriptor {
    post_bundle(&bundle_of_requests(requests, bundle_type))
}

// ---------------------------------------------------------------------------
// Decompose
// ---------------------------------------------------------------------------

/// Bundle resources grouped by `resourceType`, entry order preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourcesMap {
    groups: HashMap<String, Vec<Resource>>,
}

impl ResourcesMap {
    /// Resources of one type; empty when the bundle held none
    pub fn get(&self, resource_type: &str) -> &[Resource] {
        self.groups
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn into_group(mut self, resource_type: &str) -> Vec<Resource> {
        self.groups.remove(resource_type).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Group entry resources by type. Entries without a resource are skipped.
pub fn extract_bundle_resources(bundle: &Bundle) -> ResourcesMap {
    let mut groups: HashMap<String, Vec<Resource>> = HashMap::new();
    for resource in bundle.resources() {
        groups
            .entry(resource.resource_type.clone())
            .or_default()
            .push(resource.clone());
    }
    ResourcesMap { groups }
}

pub fn get_included_resources<'a>(map: &'a ResourcesMap, resource_type: &str) -> &'a [Resource] {
    map.get(resource_type)
}

/// Resolve a reference against included resources
pub fn get_included_resource<'a>(
    map: &'a ResourcesMap,
    reference: &Reference,
) -> Option<&'a Resource> {
    map.get(&reference.resource_type)
        .iter()
        .find(|resource| resource.id.as_deref() == Some(reference.id.as_str()))
}

/// Resources of the searched type, excluding `_include`d ones
pub fn get_main_resources(bundle: &Bundle, resource_type: &str) -> Vec<Resource> {
    bundle
        .resources()
        .filter(|resource| resource.resource_type == resource_type)
        .cloned()
        .collect()
}

/// Exactly one resource of the type, or which way the cardinality was off.
pub fn find_single(map: &ResourcesMap, resource_type: &str) -> Result<Resource, ExtractionError> {
    match map.get(resource_type) {
        [] => Err(ExtractionError::NoResourcesFound),
        [resource] => Ok(resource.clone()),
        _ => Err(ExtractionError::TooManyResourcesFound),
    }
}

/// Primary resource of a composite save: the first resource of its type in
/// the transaction response.
pub fn extract_primary(
    bundle: Option<&Bundle>,
    resource_type: &str,
) -> Result<Resource, ExtractionError> {
    let bundle = bundle
        .filter(|bundle| !bundle.entry.is_empty())
        .ok_or(ExtractionError::EmptyResponse)?;

    extract_bundle_resources(bundle)
        .into_group(resource_type)
        .into_iter()
        .next()
        .ok_or(ExtractionError::NoResourcesFound)
}
