//! Core traits for the event bus.

use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;

use anyhow::Result;
use async_trait::async_trait;

use crate::bus::EventBus;

/// Anything usable as a routing key.
pub trait TopicKey: Eq + Hash + Clone + Display + Send + Sync + 'static {}

impl<T> TopicKey for T where T: Eq + Hash + Clone + Display + Send + Sync + 'static {}

/// A subscriber. Receives its own copy of the event plus the bus it was
/// delivered on, so it can publish follow-up events.
#[async_trait]
pub trait EventHandler<T: TopicKey, E: Clone + Send + Sync + 'static>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn handle(&self, event: E, bus: &EventBus<T, E>) -> Result<()>;
}

/// Adapts an async closure over the event into a handler.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

pub fn handler_fn<F>(name: impl Into<String>, f: F) -> FnHandler<F> {
    FnHandler {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<T, E, F, Fut> EventHandler<T, E> for FnHandler<F>
where
    T: TopicKey,
    E: Clone + Send + Sync + 'static,
    F: Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: E, _bus: &EventBus<T, E>) -> Result<()> {
        (self.f)(event).await
    }
}
