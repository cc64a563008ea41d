//! fhir-client: async FHIR REST client
//!
//! Sends the request descriptors built by `fhir-core` through a pluggable
//! [`Transport`] (reqwest by default) and exposes bindings that keep a
//! `RemoteData` state slot in sync with the server.

pub mod bindings;
pub mod config;
pub mod error;
pub mod service;
pub mod transport;

pub use bindings::{CrudBinding, CrudOptions, EventBus, PagerBinding, ServiceBinding, SharedState};
pub use config::ClientConfig;
pub use error::ClientError;
pub use service::FhirClient;
pub use transport::{Credentials, HttpTransport, Transport, with_elevated_access};
