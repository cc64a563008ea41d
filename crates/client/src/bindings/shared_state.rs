//! Value shared between independent parts of an application, with change
//! notification through an [`EventBus`].

use std::sync::{Arc, Mutex, PoisonError};

use super::bus::{EventBus, Subscription};

pub struct SharedState<S> {
    value: Arc<Mutex<S>>,
    bus: EventBus<S>,
}

impl<S> Clone for SharedState<S> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            bus: self.bus.clone(),
        }
    }
}

impl<S: Clone + Send + 'static> SharedState<S> {
    pub fn new(initial: S) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
            bus: EventBus::new(),
        }
    }

    pub fn get(&self) -> S {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: S) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value.clone();
        self.bus.dispatch(&value);
    }

    /// Current value plus a subscription for every later change
    pub fn subscribe(
        &self,
        callback: impl Fn(&S) + Send + Sync + 'static,
    ) -> (S, Subscription) {
        let subscription = self.bus.subscribe(callback);
        (self.get(), subscription)
    }
}
