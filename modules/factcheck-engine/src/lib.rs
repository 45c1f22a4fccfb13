//! In-process event bus.
//!
//! Handlers subscribe to topics; `publish` awaits every handler for the topic
//! in registration order on the caller's task. A failing or panicking handler
//! is logged and skipped, never surfaced to the publisher.

pub mod bus;
pub mod recorder;
pub mod traits;

pub use bus::EventBus;
pub use recorder::EventRecorder;
pub use traits::{handler_fn, EventHandler, FnHandler, TopicKey};
