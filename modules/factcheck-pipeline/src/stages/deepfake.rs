//! `deepfake_detection`: score the video for audio/video manipulation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use factcheck_common::{
    Envelope, FactCheckError, ManipulationScores, Payload, Probability, RecordPatch, ScoredClaim,
    Stage,
};

use crate::stages::{unexpected_payload, StageRunner};
use crate::traits::{ManipulationScorer, MediaHandle, RecordStore};

// ---------------------------------------------------------------------------
// HttpManipulationScorer
// ---------------------------------------------------------------------------

/// Client for a scoring service that accepts a multipart `file` upload at
/// `POST {base_url}/analyze`.
pub struct HttpManipulationScorer {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    video_fake_prob: f64,
    audio_fake_prob: f64,
}

impl HttpManipulationScorer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to build scorer HTTP client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ManipulationScorer for HttpManipulationScorer {
    async fn score(&self, media: &MediaHandle) -> Result<(f64, f64)> {
        let bytes = tokio::fs::read(media.path())
            .await
            .with_context(|| format!("reading {}", media.path().display()))?;
        let file_name = media
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(media.mime_type())?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response: ScoreResponse = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok((response.video_fake_prob, response.audio_fake_prob))
    }
}

// ---------------------------------------------------------------------------
// DeepfakeStage
// ---------------------------------------------------------------------------

pub struct DeepfakeStage {
    scorer: Arc<dyn ManipulationScorer>,
    store: Arc<dyn RecordStore>,
}

impl DeepfakeStage {
    pub fn new(scorer: Arc<dyn ManipulationScorer>, store: Arc<dyn RecordStore>) -> Self {
        Self { scorer, store }
    }
}

fn probability(value: f64, field: &str) -> Result<Probability, FactCheckError> {
    Probability::new(value)
        .ok_or_else(|| FactCheckError::Validation(format!("{field} out of range: {value}")))
}

#[async_trait]
impl StageRunner for DeepfakeStage {
    fn stage(&self) -> Stage {
        Stage::DeepfakeDetection
    }

    async fn run(&self, envelope: Envelope) -> Result<Payload, FactCheckError> {
        let extracted = match envelope.data {
            Payload::ClaimExtracted(extracted) => extracted,
            other => return Err(unexpected_payload(self.stage(), &other)),
        };
        if extracted.video.video_path.trim().is_empty() {
            return Err(FactCheckError::Validation("videoPath is required".into()));
        }
        let request_id = extracted.request().request_id.clone();

        let (video, audio) = self
            .scorer
            .score(&MediaHandle::new(&extracted.video.video_path))
            .await
            .map_err(|e| FactCheckError::Scoring(e.to_string()))?;
        let scores = ManipulationScores::new(
            probability(video, "probVideoFake")?,
            probability(audio, "probAudioFake")?,
        );

        info!(
            request_id = %request_id,
            video,
            audio,
            combined = scores.combined(),
            verdict = ?scores.verdict(),
            "Manipulation scored"
        );

        let patch = RecordPatch {
            prob_video_fake: scores.video,
            prob_audio_fake: scores.audio,
            ..RecordPatch::default()
        };
        self.store
            .update(&request_id, &patch)
            .await
            .map_err(|e| FactCheckError::Persistence(e.to_string()))?;

        Ok(Payload::DeepfakeScored(ScoredClaim { extracted, scores }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use factcheck_common::Topic;

    fn envelope() -> Envelope {
        Envelope::new(
            Topic::run(Stage::DeepfakeDetection),
            "r1",
            Payload::ClaimExtracted(extracted_claim("r1", "Lula signs decree")),
        )
    }

    #[tokio::test]
    async fn scores_are_persisted() {
        let store = Arc::new(MemoryRecordStore::new().with_record("r1", record_for("r1")));
        let stage = DeepfakeStage::new(Arc::new(StubScorer::new(0.2, 0.1)), store.clone());

        let payload = stage.run(envelope()).await.unwrap();

        let Payload::DeepfakeScored(scored) = payload else {
            panic!("expected scored payload");
        };
        assert_eq!(scored.scores.video.map(Probability::value), Some(0.2));
        let record = store.get("r1").await.unwrap().unwrap();
        assert_eq!(record.prob_audio_fake.map(Probability::value), Some(0.1));
        assert_eq!(record.user_id, "u1");
    }

    #[tokio::test]
    async fn out_of_range_probability_is_rejected() {
        let stage = DeepfakeStage::new(
            Arc::new(StubScorer::new(1.4, 0.1)),
            Arc::new(MemoryRecordStore::new()),
        );
        let err = stage.run(envelope()).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn scorer_failure_is_scoring_error() {
        let stage = DeepfakeStage::new(Arc::new(StubScorer::failing()), Arc::new(MemoryRecordStore::new()));
        let err = stage.run(envelope()).await.unwrap_err();
        assert!(matches!(err, FactCheckError::Scoring(_)));
    }

    #[tokio::test]
    async fn scorer_reports_missing_media_file() {
        let dir = tempfile::tempdir().unwrap();
        let scorer = HttpManipulationScorer::new("http://127.0.0.1:8000/");

        let err = scorer
            .score(&MediaHandle::new(dir.path().join("missing.mp4")))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("missing.mp4"));
    }
}
