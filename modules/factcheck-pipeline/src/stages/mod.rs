//! Stage handlers. Each stage consumes its `<stage>.run` topic and publishes
//! exactly one of `<stage>.completed` or `<stage>.failed`.

pub mod acknowledge;
pub mod analysis;
pub mod claim_extraction;
pub mod deepfake;
pub mod delivery;
pub mod download;
pub mod related_news;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use factcheck_common::{Envelope, FactCheckError, Payload, Stage, Topic};
use factcheck_engine::{EventBus, EventHandler};

pub use acknowledge::AcknowledgeStage;
pub use analysis::AnalysisStage;
pub use claim_extraction::ClaimExtractionStage;
pub use deepfake::{DeepfakeStage, HttpManipulationScorer};
pub use delivery::{chunk_message, send_chunked, DeliveryStage, MAX_MESSAGE_CHARS};
pub use download::{DownloadStage, HttpMediaDownloader};
pub use related_news::RelatedNewsStage;

pub type Bus = EventBus<Topic, Envelope>;

/// The work of one stage, independent of the bus.
#[async_trait]
pub trait StageRunner: Send + Sync {
    fn stage(&self) -> Stage;

    /// Consume the trigger envelope and produce the completion payload.
    async fn run(&self, envelope: Envelope) -> Result<Payload, FactCheckError>;
}

/// Adapts a `StageRunner` to the bus: runs it and publishes the outcome.
pub struct StageHandler<R> {
    runner: R,
    name: String,
}

impl<R: StageRunner> StageHandler<R> {
    pub fn new(runner: R) -> Self {
        let name = format!("{}_stage", runner.stage());
        Self { runner, name }
    }
}

#[async_trait]
impl<R: StageRunner> EventHandler<Topic, Envelope> for StageHandler<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Envelope, bus: &Bus) -> Result<()> {
        let stage = self.runner.stage();
        let request_id = event.id.clone();

        let outcome = match self.runner.run(event).await {
            Ok(payload) => {
                info!(request_id = %request_id, %stage, "Stage completed");
                Envelope::new(Topic::completed(stage), request_id, payload)
            }
            Err(e) => {
                warn!(request_id = %request_id, %stage, error = %e, "Stage failed");
                Envelope::failed(stage, request_id, e)
            }
        };
        bus.publish(outcome.topic, outcome).await;
        Ok(())
    }
}

/// Error for a trigger that carries the wrong kind of payload.
pub(crate) fn unexpected_payload(stage: Stage, payload: &Payload) -> FactCheckError {
    FactCheckError::Validation(format!(
        "{stage} cannot run on a {} payload",
        payload.kind_name()
    ))
}
