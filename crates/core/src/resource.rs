//! FHIR resources and references
//!
//! Resources are kept schemaless: only `resourceType`, `id` and `meta` are
//! typed, everything else lives in `fields` so that nothing is lost on a round
//! trip through the server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::FhirError;

/// Keys a plain reference object may carry
const REFERENCE_KEYS: [&str; 9] = [
    "id",
    "resourceType",
    "_id",
    "resource",
    "display",
    "identifier",
    "uri",
    "localRef",
    "extension",
];

/// Resource metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Any FHIR resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            meta: None,
            fields: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_version(mut self, version_id: impl Into<String>) -> Self {
        self.meta.get_or_insert_with(Meta::default).version_id = Some(version_id.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Version used for optimistic concurrency, if the server assigned one
    pub fn version_id(&self) -> Option<&str> {
        self.meta.as_ref()?.version_id.as_deref()
    }

    pub fn field(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    /// `/{type}` or `/{type}/{id}`
    pub fn path(&self) -> String {
        match &self.id {
            Some(id) => format!("/{}/{}", self.resource_type, id),
            None => format!("/{}", self.resource_type),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        // A struct of strings and JSON maps always serializes.
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// Lightweight pointer to a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub resource_type: String,
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn path(&self) -> String {
        format!("/{}/{}", self.resource_type, self.id)
    }
}

/// Build a reference to a stored resource.
pub fn get_reference(resource: &Resource, display: Option<&str>) -> Result<Reference, FhirError> {
    let id = resource
        .id
        .clone()
        .ok_or_else(|| FhirError::MissingId(resource.resource_type.clone()))?;

    Ok(Reference {
        resource_type: resource.resource_type.clone(),
        id,
        display: display.map(str::to_string),
    })
}

pub fn make_reference(
    resource_type: impl Into<String>,
    id: impl Into<String>,
    display: Option<&str>,
) -> Reference {
    Reference {
        resource_type: resource_type.into(),
        id: id.into(),
        display: display.map(str::to_string),
    }
}

/// Whether a JSON value looks like a reference rather than a full resource:
/// an object carrying no keys outside the reference whitelist.
pub fn is_reference(value: &JsonValue) -> bool {
    match value.as_object() {
        Some(object) => object
            .keys()
            .all(|key| REFERENCE_KEYS.contains(&key.as_str())),
        None => false,
    }
}
