//! Human-readable rendering of failure payloads
//!
//! A failure is one of: an OperationOutcome returned by the server, a backend
//! error `{"error": code, "error_description": text}`, the `"Network Error"`
//! marker produced when no response arrived, or anything else (unknown).

use std::collections::HashMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::outcome::OperationOutcome;

pub const UNKNOWN_ERROR_CODE: &str = "unknown";
pub const NETWORK_ERROR_CODE: &str = "network_error";

/// Failure payload used when a request never got a response
pub const NETWORK_ERROR: &str = "Network Error";

pub fn is_operation_outcome(error: &JsonValue) -> bool {
    error.get("resourceType").and_then(JsonValue::as_str) == Some("OperationOutcome")
}

pub fn is_backend_error(error: &JsonValue) -> bool {
    error.is_object() && error.get("error").is_some()
}

/// Whether the failure is a version conflict (stale `If-Match`)
pub fn is_conflict(error: &JsonValue) -> bool {
    if !is_operation_outcome(error) {
        return false;
    }
    match serde_json::from_value::<OperationOutcome>(error.clone()) {
        Ok(outcome) => outcome.is_conflict(),
        Err(_) => issues(error).any(|issue| issue_code(issue) == Some("conflict")),
    }
}

fn issues(error: &JsonValue) -> impl Iterator<Item = &JsonValue> {
    error
        .get("issue")
        .and_then(JsonValue::as_array)
        .into_iter()
        .flatten()
}

fn issue_code(issue: &JsonValue) -> Option<&str> {
    issue.get("code").and_then(JsonValue::as_str)
}

fn is_network_error(error: &JsonValue) -> bool {
    error.as_str() == Some(NETWORK_ERROR)
}

pub fn extract_error_code(error: &JsonValue) -> String {
    let code = if is_network_error(error) {
        Some(NETWORK_ERROR_CODE)
    } else if is_operation_outcome(error) {
        issues(error).next().and_then(issue_code)
    } else if is_backend_error(error) {
        error.get("error").and_then(JsonValue::as_str)
    } else {
        None
    };

    code.unwrap_or(UNKNOWN_ERROR_CODE).to_string()
}

pub fn extract_error_description(error: &JsonValue) -> String {
    let description = if is_network_error(error) {
        Some("Network error")
    } else if is_operation_outcome(error) {
        issues(error).next().and_then(|issue| {
            issue
                .pointer("/details/text")
                .or_else(|| issue.get("diagnostics"))
                .and_then(JsonValue::as_str)
        })
    } else if is_backend_error(error) {
        error.get("error_description").and_then(JsonValue::as_str)
    } else {
        None
    };

    description.unwrap_or("Unknown error").to_string()
}

type Formatter = Box<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Overrides for [`format_error`]
#[derive(Default)]
pub struct FormatOptions {
    mapping: HashMap<String, String>,
    format: Option<Formatter>,
}

impl fmt::Debug for FormatOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatOptions")
            .field("mapping", &self.mapping)
            .field("format", &self.format.is_some())
            .finish()
    }
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed message for an error code
    pub fn with_message(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.mapping.insert(code.into(), message.into());
        self
    }

    pub fn with_mapping(mut self, mapping: HashMap<String, String>) -> Self {
        self.mapping.extend(mapping);
        self
    }

    /// Formatter for codes missing from the mapping; receives code and description
    pub fn with_format(
        mut self,
        format: impl Fn(&str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.format = Some(Box::new(format));
        self
    }
}

/// Render a failure for display.
///
/// A mapped code wins, then the custom formatter, then
/// `"{description} ({code})"`. Unknown and network errors show only the
/// description.
pub fn format_error(error: &JsonValue, options: &FormatOptions) -> String {
    let code = extract_error_code(error);
    if let Some(message) = options.mapping.get(&code) {
        return message.clone();
    }

    let description = extract_error_description(error);
    if let Some(format) = &options.format {
        return format(&code, &description);
    }

    if code == UNKNOWN_ERROR_CODE || code == NETWORK_ERROR_CODE {
        description
    } else {
        format!("{description} ({code})")
    }
}
