//! Per-resource-type soft-delete configuration
//!
//! Each mapped type names the field that marks a record inactive and the value
//! meaning "inactive". Searches exclude inactive records by default, and soft
//! deletion patches the field to that value.

use std::collections::HashMap;

use serde_json::{Value as JsonValue, json};

use crate::search::{SearchParam, SearchParams};

#[derive(Debug, Clone, PartialEq)]
pub struct InactiveMappingItem {
    pub search_field: String,
    pub status_field: String,
    pub value: JsonValue,
}

impl InactiveMappingItem {
    /// `status` field set to the given code
    pub fn status(value: &str) -> Self {
        Self {
            search_field: "status".to_string(),
            status_field: "status".to_string(),
            value: json!(value),
        }
    }

    /// `active` flag set to `false`
    pub fn inactive_flag() -> Self {
        Self {
            search_field: "active".to_string(),
            status_field: "active".to_string(),
            value: json!(false),
        }
    }

    /// `{"<searchField>:not": [value]}`
    pub fn exclusion_filter(&self) -> SearchParams {
        let value = match &self.value {
            JsonValue::String(text) => text.clone(),
            other => other.to_string(),
        };
        SearchParams::new().with(
            format!("{}:not", self.search_field),
            SearchParam::Values(vec![value]),
        )
    }

    /// Patch body that marks a record inactive
    pub fn patch_body(&self) -> JsonValue {
        let mut body = serde_json::Map::new();
        body.insert(self.status_field.clone(), self.value.clone());
        JsonValue::Object(body)
    }
}

/// Resource type -> inactive marker
#[derive(Debug, Clone, PartialEq)]
pub struct InactiveMapping {
    items: HashMap<String, InactiveMappingItem>,
}

impl Default for InactiveMapping {
    fn default() -> Self {
        let entered_in_error = [
            "DocumentReference",
            "Observation",
            "Slot",
            "Note",
            "EpisodeOfCare",
        ];
        let inactive_flag = ["Schedule", "Practitioner", "Patient", "User"];

        let mut mapping = Self::empty();
        for resource_type in entered_in_error {
            mapping.insert(resource_type, InactiveMappingItem::status("entered-in-error"));
        }
        for resource_type in inactive_flag {
            mapping.insert(resource_type, InactiveMappingItem::inactive_flag());
        }
        mapping.insert("Location", InactiveMappingItem::status("inactive"));
        mapping
    }
}

impl InactiveMapping {
    /// Mapping with no entries: no default filters, no soft delete
    pub fn empty() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    pub fn with(mut self, resource_type: impl Into<String>, item: InactiveMappingItem) -> Self {
        self.insert(resource_type, item);
        self
    }

    pub fn insert(&mut self, resource_type: impl Into<String>, item: InactiveMappingItem) {
        self.items.insert(resource_type.into(), item);
    }

    pub fn get(&self, resource_type: &str) -> Option<&InactiveMappingItem> {
        self.items.get(resource_type)
    }

    /// Default search constraint for a type; empty when the type is unmapped
    pub fn search_param(&self, resource_type: &str) -> SearchParams {
        self.get(resource_type)
            .map(InactiveMappingItem::exclusion_filter)
            .unwrap_or_default()
    }
}
