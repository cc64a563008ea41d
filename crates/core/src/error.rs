use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use crate::outcome::{IssueType, OperationOutcome};

/// Misuse of the request builders.
///
/// These are returned before any request is sent and are never folded into a
/// `RemoteData::Failure`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FhirError {
    #[error("Resource id and search parameters are not specified")]
    MissingIdAndSearchParams,

    #[error("Specify inactiveMapping for {0} to mark item deleted")]
    InactiveMappingMissing(String),

    #[error("Resource {0} has no id")]
    MissingId(String),

    #[error("Remote data is not successful: {0}")]
    NotSuccessful(String),
}

impl FhirError {
    /// Render as an OperationOutcome, e.g. for logging alongside server errors
    pub fn to_outcome(&self) -> OperationOutcome {
        let issue_type = match self {
            FhirError::NotSuccessful(_) => IssueType::Exception,
            _ => IssueType::Invalid,
        };
        OperationOutcome::error(issue_type, &self.to_string())
    }
}

/// Cardinality violations when pulling resources out of a response bundle
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("No resources found")]
    NoResourcesFound,

    #[error("Too many resources found")]
    TooManyResourcesFound,

    #[error("Empty response from server")]
    EmptyResponse,
}

impl ExtractionError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::NoResourcesFound => "no_resources_found",
            ExtractionError::TooManyResourcesFound => "too_many_resources_found",
            ExtractionError::EmptyResponse => "empty_response",
        }
    }

    /// Backend-error shape: `{"error": code, "error_description": text}`
    pub fn to_json(&self) -> JsonValue {
        json!({
            "error": self.code(),
            "error_description": self.to_string(),
        })
    }
}
