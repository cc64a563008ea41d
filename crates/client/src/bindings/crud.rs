//! Single-resource editing binding: load, save and soft delete

use std::sync::Arc;

use fhir_core::addressing::mark_as_deleted;
use fhir_core::resource::{get_reference, make_reference};
use fhir_core::{FhirError, RemoteData, Resource};
use tokio::sync::watch;

use super::StateSlot;
use crate::service::FhirClient;

#[derive(Debug, Clone, Default)]
pub struct CrudOptions {
    /// Resource to load; without it the binding starts from the default resource
    pub id: Option<String>,
    /// Fall back to the default resource (keeping `id`) when loading fails
    pub get_or_create: bool,
    /// Fields merged over the default resource
    pub default_resource: Option<Resource>,
}

#[derive(Clone)]
pub struct CrudBinding {
    client: FhirClient,
    resource_type: String,
    options: CrudOptions,
    slot: Arc<StateSlot<Resource>>,
}

impl CrudBinding {
    pub fn new(client: FhirClient, resource_type: impl Into<String>, options: CrudOptions) -> Self {
        Self {
            client,
            resource_type: resource_type.into(),
            options,
            slot: StateSlot::new(),
        }
    }

    fn make_default_resource(&self) -> Resource {
        let mut resource = Resource::new(self.resource_type.clone());
        if self.options.get_or_create {
            resource.id = self.options.id.clone();
        }

        if let Some(defaults) = &self.options.default_resource {
            if defaults.id.is_some() {
                resource.id = defaults.id.clone();
            }
            if defaults.meta.is_some() {
                resource.meta = defaults.meta.clone();
            }
            resource.fields.extend(defaults.fields.clone());
        }
        resource
    }

    /// Initial load: fetch by id, or start from the default resource
    pub async fn load(&self) -> RemoteData<Resource> {
        let Some(id) = self.options.id.as_deref() else {
            let result = RemoteData::Success(self.make_default_resource());
            self.slot.set(result.clone());
            return result;
        };

        let ticket = self.slot.begin();
        let reference = make_reference(self.resource_type.as_str(), id, None);
        let response = self.client.get_fhir_resource(&reference).await;

        let result = if response.is_failure() && self.options.get_or_create {
            tracing::debug!(
                resource_type = %self.resource_type,
                id,
                "Resource not loaded, starting from default"
            );
            RemoteData::Success(self.make_default_resource())
        } else {
            response
        };

        self.slot.commit(ticket, result.clone());
        result
    }

    /// Save the resource. With related resources everything goes in one
    /// transaction and the state becomes the saved primary resource.
    pub async fn handle_save(
        &self,
        resource: &Resource,
        related: &[Resource],
    ) -> RemoteData<Resource> {
        let ticket = self.slot.begin();
        let result = if related.is_empty() {
            self.client.save_fhir_resource(resource).await
        } else {
            self.client.save_with_related(resource, related).await
        };

        self.slot.commit(ticket, result.clone());
        result
    }

    /// Soft delete. Misconfiguration is reported before the state changes.
    pub async fn handle_delete(
        &self,
        resource: &Resource,
    ) -> Result<RemoteData<Resource>, FhirError> {
        let reference = get_reference(resource, None)?;
        let request = mark_as_deleted(&reference, self.client.inactive_mapping())?;

        let ticket = self.slot.begin();
        let result = self.client.apply_fhir_service(&request).await;
        self.slot.commit(ticket, result.clone());
        Ok(result)
    }

    pub fn state(&self) -> RemoteData<Resource> {
        self.slot.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<RemoteData<Resource>> {
        self.slot.subscribe()
    }

    pub async fn settled(&self) -> RemoteData<Resource> {
        self.slot.settled().await
    }
}
