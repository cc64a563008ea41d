//! Strip empty values from resources before they are sent

use serde_json::{Map, Value as JsonValue};

fn is_empty(value: &JsonValue) -> bool {
    match value {
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(object) => object.is_empty(),
        _ => false,
    }
}

/// Recursively drop empty objects and arrays from objects.
///
/// Inside arrays, empty items become `null` so positions are preserved.
pub fn clean_empty_values(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| {
                    if is_empty(item) {
                        JsonValue::Null
                    } else {
                        clean_empty_values(item)
                    }
                })
                .collect(),
        ),
        JsonValue::Object(object) => {
            let mut cleaned = Map::new();
            for (key, item) in object {
                let item = clean_empty_values(item);
                if !is_empty(&item) {
                    cleaned.insert(key.clone(), item);
                }
            }
            JsonValue::Object(cleaned)
        }
        other => other.clone(),
    }
}

/// Recursively drop `null` members from objects; array items are kept.
pub fn remove_nulls_from_dicts(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(items) => {
            JsonValue::Array(items.iter().map(remove_nulls_from_dicts).collect())
        }
        JsonValue::Object(object) => JsonValue::Object(
            object
                .iter()
                .filter(|(_, item)| !item.is_null())
                .map(|(key, item)| (key.clone(), remove_nulls_from_dicts(item)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Cleaning applied to every resource body written to the server
pub fn clean_object(value: &JsonValue) -> JsonValue {
    remove_nulls_from_dicts(&clean_empty_values(value))
}
