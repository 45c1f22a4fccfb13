//! In-memory event capture for tests and diagnostics.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::bus::EventBus;
use crate::traits::{EventHandler, TopicKey};

/// Handler that keeps every `(topic, event)` it receives.
///
/// Clones share the same buffer, so one clone can be subscribed to many
/// topics while another is kept for assertions.
#[derive(Clone)]
pub struct EventRecorder<T, E> {
    name: String,
    seen: Arc<Mutex<Vec<(T, E)>>>,
    topic_of: Arc<dyn Fn(&E) -> T + Send + Sync>,
}

impl<T: TopicKey, E: Clone + Send + Sync + 'static> EventRecorder<T, E> {
    /// `topic_of` recovers the topic from an event, since handlers only
    /// receive the event itself.
    pub fn new(topic_of: impl Fn(&E) -> T + Send + Sync + 'static) -> Self {
        Self {
            name: "event_recorder".to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
            topic_of: Arc::new(topic_of),
        }
    }

    /// Subscribe a clone of this recorder to every topic in `topics`.
    pub fn attach(&self, bus: &EventBus<T, E>, topics: impl IntoIterator<Item = T>) {
        for topic in topics {
            bus.subscribe(topic, Arc::new(self.clone()));
        }
    }

    pub fn events(&self) -> Vec<(T, E)> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn topics(&self) -> Vec<T> {
        self.events().into_iter().map(|(t, _)| t).collect()
    }

    /// Most recent event delivered on `topic`.
    pub fn last_on(&self, topic: &T) -> Option<E> {
        self.events()
            .into_iter()
            .rev()
            .find(|(t, _)| t == topic)
            .map(|(_, e)| e)
    }

    pub fn count_on(&self, topic: &T) -> usize {
        self.events().iter().filter(|(t, _)| t == topic).count()
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl<T: TopicKey, E: Clone + Send + Sync + 'static> EventHandler<T, E> for EventRecorder<T, E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: E, _bus: &EventBus<T, E>) -> Result<()> {
        let topic = (self.topic_of)(&event);
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((topic, event));
        Ok(())
    }
}
