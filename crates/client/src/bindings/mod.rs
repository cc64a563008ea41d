//! Bindings: `RemoteData` state slots driven by FHIR calls
//!
//! A binding owns a `watch` channel holding the current `RemoteData` and an
//! epoch counter. Every trigger bumps the epoch; a result is only committed
//! if no newer trigger happened while it was in flight, so the latest
//! trigger always wins and superseded results are dropped.

pub mod bus;
pub mod crud;
pub mod pager;
pub mod service;
pub mod shared_state;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fhir_core::RemoteData;
use serde_json::Value as JsonValue;
use tokio::sync::watch;

pub use bus::{EventBus, Subscription};
pub use crud::{CrudBinding, CrudOptions};
pub use pager::{DEFAULT_PAGE_SIZE, PagerBinding};
pub use service::ServiceBinding;
pub use shared_state::SharedState;

/// Epoch captured when a load was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

/// Latest-wins state slot shared by the bindings
#[derive(Debug)]
pub(crate) struct StateSlot<S, F = JsonValue> {
    state: watch::Sender<RemoteData<S, F>>,
    epoch: AtomicU64,
}

impl<S, F> StateSlot<S, F> {
    pub(crate) fn new() -> Arc<Self> {
        let (state, _) = watch::channel(RemoteData::NotAsked);
        Arc::new(Self {
            state,
            epoch: AtomicU64::new(0),
        })
    }

    /// Supersede everything in flight and enter `Loading`
    pub(crate) fn begin(&self) -> Ticket {
        let ticket = Ticket(self.epoch.fetch_add(1, Ordering::SeqCst) + 1);
        self.state.send_replace(RemoteData::Loading);
        ticket
    }

    /// Store `result` unless a newer trigger superseded `ticket`.
    pub(crate) fn commit(&self, ticket: Ticket, result: RemoteData<S, F>) -> bool {
        let committed = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != ticket.0 {
                return false;
            }
            *state = result;
            true
        });

        if !committed {
            tracing::debug!(epoch = ticket.0, "Discarded stale result");
        }
        committed
    }

    /// Overwrite the state directly, superseding anything in flight
    pub(crate) fn set(&self, value: RemoteData<S, F>) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(value);
    }

    /// Transform the success payload in place; other states are untouched
    pub(crate) fn update(&self, transformer: impl FnOnce(&mut S)) {
        self.state.send_if_modified(|state| match state {
            RemoteData::Success(data) => {
                transformer(data);
                true
            }
            _ => false,
        });
    }

    pub(crate) fn inspect<R>(&self, inspector: impl FnOnce(&RemoteData<S, F>) -> R) -> R {
        inspector(&self.state.borrow())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RemoteData<S, F>> {
        self.state.subscribe()
    }
}

impl<S: Clone, F: Clone> StateSlot<S, F> {
    pub(crate) fn current(&self) -> RemoteData<S, F> {
        self.state.borrow().clone()
    }

    /// Wait until the state leaves `Loading` and return it
    pub(crate) async fn settled(&self) -> RemoteData<S, F> {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.current(),
        }
    }
}
