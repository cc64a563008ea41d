//! Shared helpers for the client integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fhir_client::{FhirClient, Transport};
use fhir_core::{InactiveMapping, RemoteData, RequestDescriptor};
use serde_json::{Value as JsonValue, json};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

type Handler = Box<dyn Fn(&RequestDescriptor) -> RemoteData<JsonValue> + Send + Sync>;

/// Transport that records every request and answers from a handler.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&RequestDescriptor) -> RemoteData<JsonValue> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Transport answering every request with the same outcome
    pub fn always(outcome: RemoteData<JsonValue>) -> Arc<Self> {
        Self::new(move |_| outcome.clone())
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RequestDescriptor {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RequestDescriptor) -> RemoteData<JsonValue> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub fn client(transport: &Arc<MockTransport>) -> FhirClient {
    FhirClient::new(transport.clone(), InactiveMapping::default())
}

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

pub fn patient(id: &str) -> JsonValue {
    json!({
        "resourceType": "Patient",
        "id": id,
        "meta": {"versionId": "1"},
        "name": [{"family": "Smith", "given": ["John"]}]
    })
}

/// Searchset page holding the given patients
pub fn searchset(ids: &[&str], links: &[(&str, &str)]) -> JsonValue {
    let entry: Vec<JsonValue> = ids
        .iter()
        .map(|id| json!({"resource": patient(id)}))
        .collect();
    let link: Vec<JsonValue> = links
        .iter()
        .map(|(relation, url)| json!({"relation": relation, "url": url}))
        .collect();

    json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "total": ids.len(),
        "link": link,
        "entry": entry
    })
}

/// Value of a query parameter on a recorded request
pub fn param(request: &RequestDescriptor, key: &str) -> Option<String> {
    request
        .params
        .as_ref()?
        .get(key)?
        .first()
        .map(str::to_string)
}
