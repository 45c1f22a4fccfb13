//! Fixed topic wiring for one pipeline, plus the inbound entry point.
//!
//! reels_download → claim_extraction → deepfake_detection →
//! disinformation_analysis → message_delivery → related_news (optional).
//! `processing_message` runs alongside the chain. Every `*.failed` topic ends
//! at one terminal handler that logs and stops.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use factcheck_common::{Envelope, FactCheckError, InboundEvent, InboundRequest, Payload, Stage, Topic, TopicKind};
use factcheck_engine::EventHandler;

use crate::evidence::{EvidenceMatcher, MatcherConfig};
use crate::stages::{
    AcknowledgeStage, AnalysisStage, Bus, ClaimExtractionStage, DeepfakeStage, DeliveryStage, DownloadStage,
    RelatedNewsStage, StageHandler,
};
use crate::traits::{
    EvidenceSource, ManipulationScorer, MediaDownloader, MediaPrompter, MessageSender, RecordStore, TextGenerator,
};
use crate::verification::{ClaimVerifier, VerifierConfig};

/// `X.completed → Y.run` edges of the main chain.
const ROUTES: [(Stage, Stage); 4] = [
    (Stage::ReelsDownload, Stage::ClaimExtraction),
    (Stage::ClaimExtraction, Stage::DeepfakeDetection),
    (Stage::DeepfakeDetection, Stage::DisinformationAnalysis),
    (Stage::DisinformationAnalysis, Stage::MessageDelivery),
];

/// Every topic the pipeline can publish.
pub fn all_topics() -> Vec<Topic> {
    Stage::ALL
        .into_iter()
        .flat_map(|stage| {
            [TopicKind::Run, TopicKind::Completed, TopicKind::Failed]
                .into_iter()
                .map(move |kind| Topic::new(stage, kind))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How `run` hands the chain off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Spawn the chain on the runtime and return immediately.
    Background,
    /// Await the whole chain on the caller's task.
    Inline,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub matcher: MatcherConfig,
    pub verifier: VerifierConfig,
    pub related_news: bool,
    pub dispatch: Dispatch,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            verifier: VerifierConfig::default(),
            related_news: true,
            dispatch: Dispatch::Background,
        }
    }
}

/// External collaborators, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub downloader: Arc<dyn MediaDownloader>,
    pub prompter: Arc<dyn MediaPrompter>,
    pub scorer: Arc<dyn ManipulationScorer>,
    pub generator: Arc<dyn TextGenerator>,
    pub sources: Vec<Arc<dyn EvidenceSource>>,
    pub store: Arc<dyn RecordStore>,
    pub sender: Arc<dyn MessageSender>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A record already exists for this request id; nothing was done.
    Duplicate,
    /// The chain was spawned and may still be running.
    Dispatched,
    /// The chain ran to its end on the caller's task.
    Completed,
}

// ---------------------------------------------------------------------------
// Routing handlers
// ---------------------------------------------------------------------------

/// Re-publishes a completion envelope as the next stage's trigger.
struct Forward {
    to: Stage,
    name: String,
}

impl Forward {
    fn new(from: Stage, to: Stage) -> Self {
        Self {
            to,
            name: format!("{from}->{to}"),
        }
    }
}

#[async_trait]
impl EventHandler<Topic, Envelope> for Forward {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Envelope, bus: &Bus) -> Result<()> {
        let topic = Topic::run(self.to);
        bus.publish(topic, Envelope { topic, ..event }).await;
        Ok(())
    }
}

/// End of the line for any failed stage. No retry, no compensation.
struct TerminalErrorHandler;

#[async_trait]
impl EventHandler<Topic, Envelope> for TerminalErrorHandler {
    fn name(&self) -> &str {
        "terminal_error"
    }

    async fn handle(&self, event: Envelope, _bus: &Bus) -> Result<()> {
        let message = match &event.data {
            Payload::Failed(failure) => failure.error.as_str(),
            _ => "unknown error",
        };
        error!(request_id = %event.id, stage = %event.topic.stage, error = message, "Pipeline stopped");
        Ok(())
    }
}

/// Logs the last completion of a request's chain.
struct FinishHandler;

#[async_trait]
impl EventHandler<Topic, Envelope> for FinishHandler {
    fn name(&self) -> &str {
        "finish"
    }

    async fn handle(&self, event: Envelope, _bus: &Bus) -> Result<()> {
        info!(request_id = %event.id, topic = %event.topic, "Pipeline finished");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    bus: Arc<Bus>,
    store: Arc<dyn RecordStore>,
    dispatch: Dispatch,
}

impl Orchestrator {
    /// Build every stage from `collaborators` and wire them onto a fresh bus.
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        let bus = Arc::new(Bus::new());
        let c = collaborators;

        let matcher = Arc::new(EvidenceMatcher::new(c.sources.clone(), config.matcher.clone()));
        let verifier = Arc::new(ClaimVerifier::new(c.generator.clone(), matcher, config.verifier.clone()));

        bus.subscribe(
            Topic::run(Stage::ProcessingMessage),
            Arc::new(StageHandler::new(AcknowledgeStage::new(c.sender.clone()))),
        );
        bus.subscribe(
            Topic::run(Stage::ReelsDownload),
            Arc::new(StageHandler::new(DownloadStage::new(c.downloader.clone(), c.store.clone()))),
        );
        bus.subscribe(
            Topic::run(Stage::ClaimExtraction),
            Arc::new(StageHandler::new(ClaimExtractionStage::new(c.prompter.clone(), c.store.clone()))),
        );
        bus.subscribe(
            Topic::run(Stage::DeepfakeDetection),
            Arc::new(StageHandler::new(DeepfakeStage::new(c.scorer.clone(), c.store.clone()))),
        );
        bus.subscribe(
            Topic::run(Stage::DisinformationAnalysis),
            Arc::new(StageHandler::new(AnalysisStage::new(verifier, c.store.clone()))),
        );
        bus.subscribe(
            Topic::run(Stage::MessageDelivery),
            Arc::new(StageHandler::new(DeliveryStage::new(c.sender.clone()))),
        );

        for (from, to) in ROUTES {
            bus.subscribe(Topic::completed(from), Arc::new(Forward::new(from, to)));
        }

        if config.related_news {
            bus.subscribe(
                Topic::run(Stage::RelatedNews),
                Arc::new(StageHandler::new(RelatedNewsStage::new(c.generator.clone(), c.sender.clone()))),
            );
            bus.subscribe(
                Topic::completed(Stage::MessageDelivery),
                Arc::new(Forward::new(Stage::MessageDelivery, Stage::RelatedNews)),
            );
            bus.subscribe(Topic::completed(Stage::RelatedNews), Arc::new(FinishHandler));
        } else {
            bus.subscribe(Topic::completed(Stage::MessageDelivery), Arc::new(FinishHandler));
        }

        let terminal: Arc<TerminalErrorHandler> = Arc::new(TerminalErrorHandler);
        for stage in Stage::ALL {
            bus.subscribe(Topic::failed(stage), terminal.clone());
        }

        Self {
            bus,
            store: c.store,
            dispatch: config.dispatch,
        }
    }

    /// The bus the pipeline is wired on, for attaching observers.
    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// Entry point for one verified inbound event.
    ///
    /// Skips the request entirely when a record already exists for its id;
    /// otherwise the id is claimed by creating its record.
    /// Otherwise starts the acknowledgement and the download concurrently;
    /// with `Dispatch::Background` this returns before either finishes.
    pub async fn run(&self, mut event: InboundEvent) -> Result<RunOutcome, FactCheckError> {
        let request_id = event.request_id();
        event.id = Some(request_id.clone());

        let request = match event.into_request() {
            Ok(request) => request,
            Err(e) => {
                self.bus
                    .publish(
                        Topic::failed(Stage::ReelsDownload),
                        Envelope::failed(Stage::ReelsDownload, request_id, &e),
                    )
                    .await;
                return Err(e);
            }
        };

        // Claim the id before dispatching so a concurrent resend sees it.
        let claimed = self
            .store
            .create_if_absent(&request_id, &request.to_record())
            .await
            .map_err(|e| FactCheckError::Persistence(e.to_string()))?;
        if !claimed {
            info!(request_id = %request_id, "Request already processed, skipping");
            return Ok(RunOutcome::Duplicate);
        }

        info!(request_id = %request_id, user_id = %request.user_id, "Request accepted");
        match self.dispatch {
            Dispatch::Inline => {
                start(&self.bus, request).await;
                Ok(RunOutcome::Completed)
            }
            Dispatch::Background => {
                let bus = self.bus.clone();
                tokio::spawn(async move { start(&bus, request).await });
                Ok(RunOutcome::Dispatched)
            }
        }
    }
}

/// Publish the acknowledgement and the first stage trigger side by side.
async fn start(bus: &Bus, request: InboundRequest) {
    let id = request.request_id.clone();
    let ack = Envelope::new(
        Topic::run(Stage::ProcessingMessage),
        id.clone(),
        Payload::Inbound(request.clone()),
    );
    let download = Envelope::new(Topic::run(Stage::ReelsDownload), id, Payload::Inbound(request));

    tokio::join!(
        bus.publish(ack.topic, ack.clone()),
        bus.publish(download.topic, download.clone()),
    );
}
