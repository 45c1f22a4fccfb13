//! The publish/subscribe registry.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use tracing::{debug, warn};

use crate::traits::{EventHandler, TopicKey};

type Handlers<T, E> = Vec<Arc<dyn EventHandler<T, E>>>;

/// Topic → handlers registry. Holds no record of past events.
pub struct EventBus<T: TopicKey, E: Clone + Send + Sync + 'static> {
    handlers: RwLock<HashMap<T, Handlers<T, E>>>,
}

impl<T: TopicKey, E: Clone + Send + Sync + 'static> Default for EventBus<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TopicKey, E: Clone + Send + Sync + 'static> EventBus<T, E> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler. Handlers for one topic run in the order they were
    /// subscribed.
    pub fn subscribe(&self, topic: T, handler: Arc<dyn EventHandler<T, E>>) {
        debug!(topic = %topic, handler = handler.name(), "Subscribed");
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.entry(topic).or_default().push(handler);
    }

    pub fn subscriber_count(&self, topic: &T) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.get(topic).map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler of `topic`, one after another.
    ///
    /// Returns once the last handler has returned. Handler errors and panics
    /// are logged and do not stop delivery to the remaining handlers.
    pub async fn publish(&self, topic: T, event: E) {
        // Snapshot so the lock is not held across handler awaits; handlers
        // may publish or subscribe themselves.
        let handlers: Handlers<T, E> = {
            let registry = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            registry.get(&topic).cloned().unwrap_or_default()
        };

        if handlers.is_empty() {
            debug!(topic = %topic, "No subscribers");
            return;
        }

        debug!(topic = %topic, handlers = handlers.len(), "Publishing");

        for handler in handlers {
            let outcome = AssertUnwindSafe(handler.handle(event.clone(), self))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(topic = %topic, handler = handler.name(), error = %e, "Handler failed");
                }
                Err(_) => {
                    warn!(topic = %topic, handler = handler.name(), "Handler panicked");
                }
            }
        }
    }
}
