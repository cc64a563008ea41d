//! Request builders for single-resource REST operations
//!
//! Every function here is pure: it only describes the request. Misuse that no
//! server round trip could fix is reported as [`FhirError`] straight away.

use crate::clean::clean_object;
use crate::error::FhirError;
use crate::inactive::InactiveMapping;
use crate::request::{HttpMethod, IF_MATCH, RequestDescriptor};
use crate::resource::{Reference, Resource};
use crate::search::SearchParams;

/// Target of a hard delete
#[derive(Debug, Clone, PartialEq)]
pub enum IdOrSearch {
    Id(String),
    Search(SearchParams),
}

impl From<&str> for IdOrSearch {
    fn from(id: &str) -> Self {
        IdOrSearch::Id(id.to_string())
    }
}

impl From<String> for IdOrSearch {
    fn from(id: String) -> Self {
        IdOrSearch::Id(id)
    }
}

impl From<SearchParams> for IdOrSearch {
    fn from(params: SearchParams) -> Self {
        IdOrSearch::Search(params)
    }
}

/// `GET /{type}/{id}`
pub fn get(reference: &Reference) -> RequestDescriptor {
    RequestDescriptor::new(HttpMethod::Get, reference.path())
}

/// `GET /{type}[/{extra_path}]` with inactive records filtered out.
///
/// The exclusion filter is only a default: a caller param with the same key
/// replaces it, and an unset one removes it.
pub fn list(
    resource_type: &str,
    params: &SearchParams,
    extra_path: Option<&str>,
    mapping: &InactiveMapping,
) -> RequestDescriptor {
    let url = match extra_path {
        Some(extra) => format!("/{resource_type}/{extra}"),
        None => format!("/{resource_type}"),
    };

    let params = params.clone().with_defaults(&mapping.search_param(resource_type));
    RequestDescriptor::new(HttpMethod::Get, url).with_params(params)
}

/// `POST /{type}`, optionally conditional on search params
pub fn create(resource: &Resource, params: Option<&SearchParams>) -> RequestDescriptor {
    let request = RequestDescriptor::new(HttpMethod::Post, format!("/{}", resource.resource_type))
        .with_data(clean_object(&resource.to_json()));

    match params {
        Some(params) => request.with_params(params.clone()),
        None => request,
    }
}

/// `PUT` by search params, or by id with `If-Match` when versioned.
pub fn update(
    resource: &Resource,
    params: Option<&SearchParams>,
) -> Result<RequestDescriptor, FhirError> {
    let data = clean_object(&resource.to_json());

    if let Some(params) = params {
        return Ok(
            RequestDescriptor::new(HttpMethod::Put, format!("/{}", resource.resource_type))
                .with_data(data)
                .with_params(params.clone()),
        );
    }

    if resource.id.is_none() {
        return Err(FhirError::MissingIdAndSearchParams);
    }

    let request = RequestDescriptor::new(HttpMethod::Put, resource.path()).with_data(data);
    Ok(match resource.version_id() {
        Some(version_id) => request.with_header(IF_MATCH, version_id),
        None => request,
    })
}

/// `PUT /{type}/{id}` when the resource has an id, `POST /{type}` otherwise.
pub fn save(resource: &Resource) -> RequestDescriptor {
    let method = if resource.id.is_some() {
        HttpMethod::Put
    } else {
        HttpMethod::Post
    };
    let request = RequestDescriptor::new(method, resource.path())
        .with_data(clean_object(&resource.to_json()));

    match (&resource.id, resource.version_id()) {
        (Some(_), Some(version_id)) => request.with_header(IF_MATCH, version_id),
        _ => request,
    }
}

/// `PATCH` by search params or by id. The body is sent as-is so that `null`
/// members can clear fields.
pub fn patch(
    resource: &Resource,
    params: Option<&SearchParams>,
) -> Result<RequestDescriptor, FhirError> {
    let data = resource.to_json();

    if let Some(params) = params {
        return Ok(
            RequestDescriptor::new(HttpMethod::Patch, format!("/{}", resource.resource_type))
                .with_data(data)
                .with_params(params.clone()),
        );
    }

    if resource.id.is_some() {
        return Ok(RequestDescriptor::new(HttpMethod::Patch, resource.path()).with_data(data));
    }

    Err(FhirError::MissingIdAndSearchParams)
}

/// Soft delete: patch the type's inactive marker.
pub fn mark_as_deleted(
    reference: &Reference,
    mapping: &InactiveMapping,
) -> Result<RequestDescriptor, FhirError> {
    let item = mapping
        .get(&reference.resource_type)
        .ok_or_else(|| FhirError::InactiveMappingMissing(reference.resource_type.clone()))?;

    Ok(RequestDescriptor::new(HttpMethod::Patch, reference.path()).with_data(item.patch_body()))
}

/// Hard `DELETE` of one resource or of everything matching a search.
pub fn force_delete(resource_type: &str, target: impl Into<IdOrSearch>) -> RequestDescriptor {
    match target.into() {
        IdOrSearch::Id(id) => {
            RequestDescriptor::new(HttpMethod::Delete, format!("/{resource_type}/{id}"))
        }
        IdOrSearch::Search(params) => {
            RequestDescriptor::new(HttpMethod::Delete, format!("/{resource_type}"))
                .with_params(params)
        }
    }
}

/// `GET /ValueSet/{id}/$expand`
pub fn get_concepts(value_set_id: &str, params: Option<&SearchParams>) -> RequestDescriptor {
    RequestDescriptor::new(HttpMethod::Get, format!("/ValueSet/{value_set_id}/$expand"))
        .with_params(params.cloned().unwrap_or_default())
}
