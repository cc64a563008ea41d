//! Client configuration

use std::time::Duration;

use fhir_core::InactiveMapping;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub inactive_mapping: InactiveMapping,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            inactive_mapping: InactiveMapping::default(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    ///
    /// Reads `FHIR_BASE_URL`, `FHIR_TOKEN` and `FHIR_TIMEOUT_SECS`; an
    /// unparsable timeout falls back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let timeout_secs = lookup("FHIR_TIMEOUT_SECS")
            .and_then(|secs| secs.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url: lookup("FHIR_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            token: lookup("FHIR_TOKEN").filter(|token| !token.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            inactive_mapping: InactiveMapping::default(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_inactive_mapping(mut self, mapping: InactiveMapping) -> Self {
        self.inactive_mapping = mapping;
        self
    }
}
