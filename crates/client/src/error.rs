//! Client error handling
//!
//! Only failures that happen before a request can be sent live here. Server
//! and network failures are reported as `RemoteData::Failure`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}
