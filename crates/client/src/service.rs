//! Typed FHIR operations on top of a [`Transport`]
//!
//! Each call builds a descriptor with `fhir_core::addressing`, sends it and
//! decodes the success payload. Builder misuse is returned as the outer
//! `Err` before any I/O; everything the server says is inside `RemoteData`.

use std::future::Future;
use std::sync::Arc;

use fhir_core::addressing::{self, IdOrSearch};
use fhir_core::bundle::{self, extract_primary, find_single};
use fhir_core::resource::get_reference;
use fhir_core::{
    Bundle, BundleType, FhirError, InactiveMapping, Reference, RemoteData, RequestDescriptor,
    Resource, SearchParams,
};
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::{HttpTransport, Transport, with_elevated_access};

const INVALID_RESPONSE: &str = "invalid_response";

fn decode<T: DeserializeOwned>(data: JsonValue) -> RemoteData<T> {
    match serde_json::from_value(data) {
        Ok(decoded) => RemoteData::Success(decoded),
        Err(error) => {
            tracing::warn!(error = %error, "Unexpected FHIR response shape");
            RemoteData::Failure(json!({
                "error": INVALID_RESPONSE,
                "error_description": error.to_string(),
            }))
        }
    }
}

/// FHIR REST client
#[derive(Clone)]
pub struct FhirClient {
    transport: Arc<dyn Transport>,
    inactive_mapping: Arc<InactiveMapping>,
}

impl FhirClient {
    pub fn new(transport: Arc<dyn Transport>, inactive_mapping: InactiveMapping) -> Self {
        Self {
            transport,
            inactive_mapping: Arc::new(inactive_mapping),
        }
    }

    /// HTTP client for the configured server
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config)?;
        tracing::info!(base_url = %transport.base_url(), "FHIR client configured");
        Ok(Self::new(
            Arc::new(transport),
            config.inactive_mapping.clone(),
        ))
    }

    pub fn inactive_mapping(&self) -> &InactiveMapping {
        &self.inactive_mapping
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    pub fn set_token(&self, token: impl Into<String>) {
        if let Some(credentials) = self.transport.credentials() {
            credentials.set_token(token);
        }
    }

    pub fn reset_token(&self) {
        if let Some(credentials) = self.transport.credentials() {
            credentials.reset_token();
        }
    }

    pub fn token(&self) -> Option<String> {
        self.transport.credentials()?.token()
    }

    /// Run `future` with `token` as the bearer credentials of its requests.
    /// The stored token is left untouched.
    pub async fn with_elevated_access<T>(
        &self,
        token: impl Into<String>,
        future: impl Future<Output = T>,
    ) -> T {
        with_elevated_access(token, future).await
    }

    // -----------------------------------------------------------------------
    // Raw requests
    // -----------------------------------------------------------------------

    /// Send a descriptor and return the raw JSON outcome
    pub async fn service(&self, request: &RequestDescriptor) -> RemoteData<JsonValue> {
        self.transport.send(request).await
    }

    /// Send a descriptor and decode the success payload
    pub async fn apply_fhir_service<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> RemoteData<T> {
        self.service(request).await.and_then(decode)
    }

    /// Send several descriptors as one transaction or batch bundle
    pub async fn apply_fhir_services(
        &self,
        requests: &[RequestDescriptor],
        bundle_type: BundleType,
    ) -> RemoteData<Bundle> {
        self.apply_fhir_service(&bundle::apply_many(requests, bundle_type))
            .await
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    pub async fn create_fhir_resource(
        &self,
        resource: &Resource,
        params: Option<&SearchParams>,
    ) -> RemoteData<Resource> {
        self.apply_fhir_service(&addressing::create(resource, params))
            .await
    }

    pub async fn update_fhir_resource(
        &self,
        resource: &Resource,
        params: Option<&SearchParams>,
    ) -> Result<RemoteData<Resource>, FhirError> {
        let request = addressing::update(resource, params)?;
        Ok(self.apply_fhir_service(&request).await)
    }

    pub async fn get_fhir_resource(&self, reference: &Reference) -> RemoteData<Resource> {
        self.apply_fhir_service(&addressing::get(reference)).await
    }

    /// One search page, inactive records excluded
    pub async fn get_fhir_resources(
        &self,
        resource_type: &str,
        params: &SearchParams,
        extra_path: Option<&str>,
    ) -> RemoteData<Bundle> {
        let request = addressing::list(resource_type, params, extra_path, &self.inactive_mapping);
        self.apply_fhir_service(&request).await
    }

    /// Every search page, following `next` links.
    ///
    /// The result is the last page with the entries of all pages in order.
    /// The first failing page aborts the walk.
    pub async fn get_all_fhir_resources(
        &self,
        resource_type: &str,
        params: &SearchParams,
        extra_path: Option<&str>,
    ) -> RemoteData<Bundle> {
        let mut result = match self
            .get_fhir_resources(resource_type, params, extra_path)
            .await
        {
            RemoteData::Success(bundle) => bundle,
            other => return other,
        };

        while let Some(next) = result.link("next").map(|link| link.url.clone()) {
            tracing::debug!(resource_type, url = %next, "Following next page link");
            let request = RequestDescriptor::new(fhir_core::HttpMethod::Get, next);
            let mut page: Bundle = match self.apply_fhir_service(&request).await {
                RemoteData::Success(page) => page,
                other => return other,
            };

            let mut entry = std::mem::take(&mut result.entry);
            entry.append(&mut page.entry);
            page.entry = entry;
            result = page;
        }

        RemoteData::Success(result)
    }

    /// Exactly one resource matching the search
    pub async fn find_fhir_resource(
        &self,
        resource_type: &str,
        params: &SearchParams,
        extra_path: Option<&str>,
    ) -> RemoteData<Resource> {
        self.get_fhir_resources(resource_type, params, extra_path)
            .await
            .and_then(|bundle| {
                let resources = bundle::extract_bundle_resources(&bundle);
                RemoteData::from(
                    find_single(&resources, resource_type).map_err(|error| error.to_json()),
                )
            })
    }

    pub async fn save_fhir_resource(&self, resource: &Resource) -> RemoteData<Resource> {
        self.apply_fhir_service(&addressing::save(resource)).await
    }

    pub async fn save_fhir_resources(
        &self,
        resources: &[Resource],
        bundle_type: BundleType,
    ) -> RemoteData<Bundle> {
        self.apply_fhir_service(&bundle::save_many(resources, bundle_type))
            .await
    }

    /// Save `primary` together with `related` in one transaction and return
    /// the saved primary resource from the response.
    pub async fn save_with_related(
        &self,
        primary: &Resource,
        related: &[Resource],
    ) -> RemoteData<Resource> {
        let mut resources = Vec::with_capacity(related.len() + 1);
        resources.push(primary.clone());
        resources.extend_from_slice(related);

        let request = bundle::save_many(&resources, BundleType::Transaction);
        self.service(&request).await.and_then(|data| {
            let response: Option<Bundle> = match data {
                JsonValue::Null => None,
                data => match decode(data) {
                    RemoteData::Success(bundle) => Some(bundle),
                    RemoteData::Failure(error) => return RemoteData::Failure(error),
                    _ => None,
                },
            };

            RemoteData::from(
                extract_primary(response.as_ref(), &primary.resource_type)
                    .map_err(|error| error.to_json()),
            )
        })
    }

    pub async fn patch_fhir_resource(
        &self,
        resource: &Resource,
        params: Option<&SearchParams>,
    ) -> Result<RemoteData<Resource>, FhirError> {
        let request = addressing::patch(resource, params)?;
        Ok(self.apply_fhir_service(&request).await)
    }

    /// Soft delete through the inactive mapping
    pub async fn delete_fhir_resource(
        &self,
        reference: &Reference,
    ) -> Result<RemoteData<Resource>, FhirError> {
        let request = addressing::mark_as_deleted(reference, &self.inactive_mapping)?;
        Ok(self.apply_fhir_service(&request).await)
    }

    /// Soft delete a stored resource
    pub async fn delete_resource(
        &self,
        resource: &Resource,
    ) -> Result<RemoteData<Resource>, FhirError> {
        let reference = get_reference(resource, None)?;
        self.delete_fhir_resource(&reference).await
    }

    pub async fn force_delete_fhir_resource(
        &self,
        resource_type: &str,
        target: impl Into<IdOrSearch>,
    ) -> RemoteData<JsonValue> {
        self.service(&addressing::force_delete(resource_type, target))
            .await
    }

    /// Expansion of a ValueSet
    pub async fn get_concepts(
        &self,
        value_set_id: &str,
        params: Option<&SearchParams>,
    ) -> RemoteData<JsonValue> {
        self.service(&addressing::get_concepts(value_set_id, params))
            .await
    }
}
