//! Binding for any async producer of `RemoteData`

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fhir_core::RemoteData;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{StateSlot, Ticket};

type Producer<S, F, D> = Arc<dyn Fn(D) -> BoxFuture<'static, RemoteData<S, F>> + Send + Sync>;

/// State slot fed by a producer, re-run on `reload` and whenever the
/// dependency value changes.
///
/// Cloning yields another handle to the same slot.
pub struct ServiceBinding<S, F = JsonValue, D = ()> {
    slot: Arc<StateSlot<S, F>>,
    deps: Arc<Mutex<D>>,
    producer: Producer<S, F, D>,
}

/// A triggered producer call waiting to be committed
struct Pending<S, F> {
    slot: Arc<StateSlot<S, F>>,
    ticket: Ticket,
    previous: RemoteData<S, F>,
    future: BoxFuture<'static, RemoteData<S, F>>,
}

impl<S, F> Pending<S, F> {
    /// Await the producer and commit its result. A panicking producer puts
    /// back the state seen before the trigger (`NotAsked` if that was
    /// `Loading`), so `settled` still resolves.
    async fn run(self) -> bool {
        match AssertUnwindSafe(self.future).catch_unwind().await {
            Ok(result) => self.slot.commit(self.ticket, result),
            Err(_) => {
                tracing::error!("Producer panicked, restoring previous state");
                self.slot.commit(self.ticket, self.previous);
                false
            }
        }
    }
}

impl<S, F, D> Clone for ServiceBinding<S, F, D> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            deps: Arc::clone(&self.deps),
            producer: Arc::clone(&self.producer),
        }
    }
}

impl<S, F> ServiceBinding<S, F, ()>
where
    S: Clone + Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    pub fn new<Fut>(producer: impl Fn() -> Fut + Send + Sync + 'static) -> Self
    where
        Fut: Future<Output = RemoteData<S, F>> + Send + 'static,
    {
        Self::with_deps((), move |()| producer())
    }
}

impl<S, F, D> ServiceBinding<S, F, D>
where
    S: Clone + Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
    D: Clone + PartialEq + Send + 'static,
{
    /// Binding whose producer receives the current dependency value
    pub fn with_deps<Fut>(deps: D, producer: impl Fn(D) -> Fut + Send + Sync + 'static) -> Self
    where
        Fut: Future<Output = RemoteData<S, F>> + Send + 'static,
    {
        Self {
            slot: StateSlot::new(),
            deps: Arc::new(Mutex::new(deps)),
            producer: Arc::new(move |deps| producer(deps).boxed()),
        }
    }

    fn lock_deps(&self) -> MutexGuard<'_, D> {
        self.deps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter `Loading` and start the producer for the current deps
    fn trigger(&self) -> Pending<S, F> {
        let deps = self.lock_deps().clone();
        let future = (self.producer)(deps);
        let previous = match self.slot.current() {
            RemoteData::Loading => RemoteData::NotAsked,
            state => state,
        };
        let ticket = self.slot.begin();
        Pending {
            slot: Arc::clone(&self.slot),
            ticket,
            previous,
            future,
        }
    }

    /// Run the producer to completion on this task.
    ///
    /// Returns whether the result was committed; `false` means a newer
    /// trigger superseded it or the producer panicked.
    pub async fn load(&self) -> bool {
        self.trigger().run().await
    }

    /// Re-run the producer in the background. The state is `Loading` by the
    /// time this returns.
    pub fn reload(&self) -> JoinHandle<bool> {
        tokio::spawn(self.trigger().run())
    }

    pub fn deps(&self) -> D {
        self.lock_deps().clone()
    }

    /// Store new deps and reload, unless they equal the current ones
    pub fn set_deps(&self, deps: D) -> Option<JoinHandle<bool>> {
        self.modify_deps(|_| deps)
    }

    /// Derive new deps from the current ones and reload if they changed
    pub fn modify_deps(&self, derive: impl FnOnce(&D) -> D) -> Option<JoinHandle<bool>> {
        {
            let mut current = self.lock_deps();
            let next = derive(&current);
            if next == *current {
                return None;
            }
            *current = next;
        }
        Some(self.reload())
    }

    /// Store new deps and reload even if they did not change
    pub fn replace_deps(&self, deps: D) -> JoinHandle<bool> {
        *self.lock_deps() = deps;
        self.reload()
    }
}

impl<S, F, D> ServiceBinding<S, F, D>
where
    S: Clone,
    F: Clone,
{
    /// Overwrite the state with a success, without calling the producer.
    /// Loads still in flight are discarded.
    pub fn set(&self, data: S) {
        self.slot.set(RemoteData::Success(data));
    }

    /// Edit the success payload in place; a no-op in any other state
    pub fn update(&self, transformer: impl FnOnce(&mut S)) {
        self.slot.update(transformer);
    }

    pub fn current(&self) -> RemoteData<S, F> {
        self.slot.current()
    }

    /// Inspect the state without cloning it
    pub fn inspect<R>(&self, inspector: impl FnOnce(&RemoteData<S, F>) -> R) -> R {
        self.slot.inspect(inspector)
    }

    pub fn subscribe(&self) -> watch::Receiver<RemoteData<S, F>> {
        self.slot.subscribe()
    }

    /// Wait for the state to leave `Loading`
    pub async fn settled(&self) -> RemoteData<S, F> {
        self.slot.settled().await
    }
}
