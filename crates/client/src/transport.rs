//! Transport adapter: turns a `RequestDescriptor` into an HTTP call
//!
//! Every outcome is folded into `RemoteData`: a 2xx body becomes `Success`,
//! any other response body becomes `Failure`, and a request that never got a
//! response fails with the `"Network Error"` marker.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use fhir_core::format::NETWORK_ERROR;
use fhir_core::{HttpMethod, RemoteData, RequestDescriptor};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Anything that can execute a request descriptor
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> RemoteData<JsonValue>;

    /// Bearer credentials used by this transport, if it authenticates
    fn credentials(&self) -> Option<&Credentials> {
        None
    }
}

/// Bearer token shared by every clone of a transport
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    token: Arc<Mutex<Option<String>>>,
}

impl Credentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> Option<String> {
        self.lock().clone()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.lock() = Some(token.into());
    }

    pub fn reset_token(&self) {
        *self.lock() = None;
    }
}

tokio::task_local! {
    static TOKEN_OVERRIDE: String;
}

/// Run `future` with `token` as the bearer credentials of every request it
/// sends.
///
/// The override is scoped to `future` only: the stored credentials are never
/// touched, so concurrent requests and overlapping scopes each keep their own
/// token. Tasks spawned from inside `future` do not inherit it.
pub async fn with_elevated_access<T>(
    token: impl Into<String>,
    future: impl Future<Output = T>,
) -> T {
    TOKEN_OVERRIDE.scope(token.into(), future).await
}

/// Token in effect for a request sent from the current task
fn effective_token(credentials: &Credentials) -> Option<String> {
    TOKEN_OVERRIDE
        .try_with(Clone::clone)
        .ok()
        .or_else(|| credentials.token())
}

/// Normalize request paths to avoid high-cardinality labels.
///
/// Segments following a resource type or `_history` are ids and collapse to
/// `:id`; operations (`$expand`) and `_`-prefixed segments are kept.
pub fn normalize_path(url: &str) -> String {
    let path = match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            rest.find('/').map_or("/", |path_start| &rest[path_start..])
        }
        None => url,
    };
    let path = path.split('?').next().unwrap_or(path);

    let mut previous: Option<&str> = None;
    path.split('/')
        .map(|segment| {
            let follows_type = previous.is_some_and(|prev| {
                prev == "_history" || prev.starts_with(|c: char| c.is_ascii_uppercase())
            });
            let is_id =
                follows_type && !segment.is_empty() && !segment.starts_with(&['$', '_'][..]);
            previous = Some(segment);
            if is_id { ":id" } else { segment }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// JSON when parseable, the raw text otherwise, `null` for an empty body
fn decode_body(text: &str) -> JsonValue {
    if text.trim().is_empty() {
        return JsonValue::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.to_string()))
}

fn no_response_failure(error: &reqwest::Error) -> JsonValue {
    if error.is_connect() || error.is_timeout() {
        JsonValue::String(NETWORK_ERROR.to_string())
    } else {
        JsonValue::String(error.to_string())
    }
}

fn record_request(method: &'static str, resource: String, status: String) {
    metrics::counter!(
        "fhir_client_requests_total",
        "method" => method,
        "resource" => resource,
        "status" => status
    )
    .increment(1);
}

/// `reqwest`-backed transport against one FHIR base URL
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        reqwest::Url::parse(&config.base_url)
            .map_err(|_| ClientError::InvalidBaseUrl(config.base_url.clone()))?;

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: Credentials::new(config.token.clone()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs (e.g. pagination links) are used as-is.
    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> RemoteData<JsonValue> {
        let request_id = Uuid::new_v4().to_string();
        let method = request.method.as_str();
        let url = self.resolve_url(&request.url_with_query());
        let resource = normalize_path(&request.url);

        tracing::debug!(method, url = %url, request_id = %request_id, "Sending FHIR request");

        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), &url)
            .header(REQUEST_ID_HEADER, &request_id);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = effective_token(&self.credentials) {
            builder = builder.bearer_auth(token);
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }

        let start = Instant::now();
        let sent = builder.send().await;
        metrics::histogram!(
            "fhir_client_request_duration_seconds",
            "method" => method,
            "resource" => resource.clone()
        )
        .record(start.elapsed().as_secs_f64());

        let response = match sent {
            Ok(response) => response,
            Err(error) => {
                record_request(method, resource, "error".to_string());
                tracing::warn!(
                    method,
                    url = %url,
                    request_id = %request_id,
                    error = %error,
                    "FHIR request got no response"
                );
                return RemoteData::Failure(no_response_failure(&error));
            }
        };

        let status = response.status();
        record_request(method, resource, status.as_u16().to_string());

        let body = match response.text().await {
            Ok(text) => decode_body(&text),
            Err(error) => {
                tracing::warn!(
                    request_id = %request_id,
                    error = %error,
                    "Failed to read FHIR response body"
                );
                return RemoteData::Failure(no_response_failure(&error));
            }
        };

        if status.is_success() {
            RemoteData::Success(body)
        } else {
            tracing::warn!(
                method,
                url = %url,
                request_id = %request_id,
                status = status.as_u16(),
                "FHIR request failed"
            );
            RemoteData::Failure(body)
        }
    }

    fn credentials(&self) -> Option<&Credentials> {
        Some(&self.credentials)
    }
}
