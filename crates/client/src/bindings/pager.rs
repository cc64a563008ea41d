//! Paginated search binding
//!
//! Pages are requested with `_count` and `_page`; navigation availability
//! comes from the `next` / `previous` links of the last successful page.

use fhir_core::{Bundle, RemoteData, SearchParam, SearchParams};
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::ServiceBinding;
use crate::service::FhirClient;

pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Page cursor fed to the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

#[derive(Clone)]
pub struct PagerBinding {
    binding: ServiceBinding<Bundle, JsonValue, PageRequest>,
}

impl PagerBinding {
    /// Pager over `resource_type`. The first page is taken from `_page` in
    /// `params` when present, 1 otherwise. Nothing is fetched until
    /// [`start`](Self::start).
    pub fn new(
        client: FhirClient,
        resource_type: impl Into<String>,
        page_size: Option<u32>,
        params: SearchParams,
    ) -> Self {
        let page = params
            .get("_page")
            .and_then(SearchParam::first)
            .and_then(|page| page.parse().ok())
            .unwrap_or(1);
        let request = PageRequest {
            page,
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        };
        let resource_type = resource_type.into();

        let binding = ServiceBinding::with_deps(request, move |request: PageRequest| {
            let client = client.clone();
            let resource_type = resource_type.clone();
            let params = params
                .clone()
                .with("_count", request.page_size)
                .with("_page", request.page);
            async move {
                client
                    .get_fhir_resources(&resource_type, &params, None)
                    .await
            }
        });

        Self { binding }
    }

    /// Fetch the initial page
    pub fn start(&self) -> JoinHandle<bool> {
        self.binding.reload()
    }

    pub fn current_page(&self) -> u32 {
        self.binding.deps().page
    }

    pub fn page_size(&self) -> u32 {
        self.binding.deps().page_size
    }

    fn has_link(&self, relation: &str) -> bool {
        self.binding
            .inspect(|state| state.success().is_some_and(|bundle| bundle.has_link(relation)))
    }

    pub fn has_next(&self) -> bool {
        self.has_link("next")
    }

    pub fn has_previous(&self) -> bool {
        self.has_link("previous")
    }

    pub fn load_next(&self) -> Option<JoinHandle<bool>> {
        self.binding.modify_deps(|request| PageRequest {
            page: request.page + 1,
            ..*request
        })
    }

    /// Go back one page; does nothing when the server reports no previous page
    pub fn load_previous(&self) -> Option<JoinHandle<bool>> {
        if !self.has_previous() {
            return None;
        }
        self.binding.modify_deps(|request| PageRequest {
            page: request.page.saturating_sub(1).max(1),
            ..*request
        })
    }

    /// Jump to `page`; a no-op when it is already the current page
    pub fn load_page(&self, page: u32) -> Option<JoinHandle<bool>> {
        self.binding
            .modify_deps(|request| PageRequest { page, ..*request })
    }

    /// Back to the first page and fetch it again
    pub fn reload(&self) -> JoinHandle<bool> {
        let request = PageRequest {
            page: 1,
            ..self.binding.deps()
        };
        self.binding.replace_deps(request)
    }

    pub fn state(&self) -> RemoteData<Bundle> {
        self.binding.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<RemoteData<Bundle>> {
        self.binding.subscribe()
    }

    pub async fn settled(&self) -> RemoteData<Bundle> {
        self.binding.settled().await
    }
}
