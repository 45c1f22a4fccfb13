//! `claim_extraction`: summarise the video, then state its claim in one
//! sentence.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use factcheck_common::{Envelope, ExtractedClaim, FactCheckError, Payload, Stage};

use crate::stages::{unexpected_payload, StageRunner};
use crate::traits::{MediaHandle, MediaPrompter, RecordStore};

const SUMMARY_PROMPT: &str = "Please extract the content of this video, including:\n\
- The main topics discussed\n\
- The participants in the video and the tone of their speech";

fn claim_prompt(summary: &str) -> String {
    format!(
        "Based on the following summary of the video, state the video's message in a single sentence:\n{summary}"
    )
}

pub struct ClaimExtractionStage {
    prompter: Arc<dyn MediaPrompter>,
    store: Arc<dyn RecordStore>,
}

impl ClaimExtractionStage {
    pub fn new(prompter: Arc<dyn MediaPrompter>, store: Arc<dyn RecordStore>) -> Self {
        Self { prompter, store }
    }
}

#[async_trait]
impl StageRunner for ClaimExtractionStage {
    fn stage(&self) -> Stage {
        Stage::ClaimExtraction
    }

    async fn run(&self, envelope: Envelope) -> Result<Payload, FactCheckError> {
        let video = match envelope.data {
            Payload::Downloaded(video) => video,
            other => return Err(unexpected_payload(self.stage(), &other)),
        };
        if video.video_path.trim().is_empty() {
            return Err(FactCheckError::Validation("videoPath is required".into()));
        }
        let request_id = video.request.request_id.clone();
        let generation = |e: anyhow::Error| FactCheckError::Generation(e.to_string());

        let media = self
            .prompter
            .upload(&MediaHandle::new(&video.video_path))
            .await
            .map_err(generation)?;
        let summary = self.prompter.ask(&media, SUMMARY_PROMPT).await.map_err(generation)?;
        let claim = self
            .prompter
            .ask(&media, &claim_prompt(summary.trim()))
            .await
            .map_err(generation)?;

        let claim = claim.trim().to_string();
        if claim.is_empty() {
            return Err(FactCheckError::Generation("model returned an empty claim".into()));
        }
        info!(request_id = %request_id, claim = %claim, "Claim extracted");

        let extracted = ExtractedClaim {
            video,
            claim,
            context: summary.trim().to_string(),
        };
        self.store
            .write(&request_id, &extracted.to_record())
            .await
            .map_err(|e| FactCheckError::Persistence(e.to_string()))?;

        Ok(Payload::ClaimExtracted(extracted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use factcheck_common::Topic;

    fn envelope(video_path: &str) -> Envelope {
        let mut video = downloaded_video("r1");
        video.video_path = video_path.to_string();
        Envelope::new(Topic::run(Stage::ClaimExtraction), "r1", Payload::Downloaded(video))
    }

    #[tokio::test]
    async fn summary_feeds_claim_prompt() {
        let prompter = Arc::new(ScriptedPrompter::new().reply("A politician speaks about food prices.").reply("Lula signs decree"));
        let store = Arc::new(MemoryRecordStore::new());
        let stage = ClaimExtractionStage::new(prompter.clone(), store.clone());

        let payload = stage.run(envelope("/tmp/media/r1.mp4")).await.unwrap();

        let Payload::ClaimExtracted(extracted) = payload else {
            panic!("expected claim payload");
        };
        assert_eq!(extracted.claim, "Lula signs decree");
        assert_eq!(extracted.context, "A politician speaks about food prices.");
        assert!(prompter.prompts()[1].contains("A politician speaks about food prices."));

        let record = store.get("r1").await.unwrap().unwrap();
        assert_eq!(record.claim, "Lula signs decree");
    }

    #[tokio::test]
    async fn empty_video_path_is_validation_error() {
        let prompter = Arc::new(ScriptedPrompter::new());
        let stage = ClaimExtractionStage::new(prompter.clone(), Arc::new(MemoryRecordStore::new()));

        let err = stage.run(envelope("")).await.unwrap_err();

        assert!(err.is_validation());
        assert!(prompter.prompts().is_empty());
    }

    #[tokio::test]
    async fn prompter_failure_is_generation_error() {
        let stage = ClaimExtractionStage::new(
            Arc::new(ScriptedPrompter::new().fail("file processing timed out")),
            Arc::new(MemoryRecordStore::new()),
        );
        let err = stage.run(envelope("/tmp/media/r1.mp4")).await.unwrap_err();
        assert!(matches!(err, FactCheckError::Generation(_)));
    }
}
