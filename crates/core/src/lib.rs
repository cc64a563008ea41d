//! fhir-core: FHIR client building blocks without I/O
//!
//! This crate provides the four-state `RemoteData` result type and its
//! combinators, resource/reference types, search parameters, request
//! descriptors for REST operations, and composition and decomposition of
//! transaction/batch/search bundles.

pub mod addressing;
pub mod bundle;
pub mod clean;
pub mod date;
pub mod error;
pub mod format;
pub mod inactive;
pub mod outcome;
pub mod remote_data;
pub mod request;
pub mod resource;
pub mod search;

pub use addressing::IdOrSearch;
pub use bundle::{
    Bundle, BundleEntry, BundleEntryRequest, BundleEntryResponse, BundleLink, BundleType,
    ResourcesMap,
};
pub use error::{ExtractionError, FhirError};
pub use format::{FormatOptions, format_error};
pub use inactive::{InactiveMapping, InactiveMappingItem};
pub use outcome::{IssueSeverity, IssueType, OperationOutcome, OperationOutcomeIssue};
pub use remote_data::{RemoteData, Sequence};
pub use request::{HttpMethod, RequestDescriptor};
pub use resource::{Meta, Reference, Resource};
pub use search::{SearchParam, SearchParams};
