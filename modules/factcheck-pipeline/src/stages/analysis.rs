//! `disinformation_analysis`: run claim verification and persist the result.

use std::sync::Arc;

use async_trait::async_trait;

use factcheck_common::{AnalyzedClaim, Envelope, FactCheckError, Payload, RecordPatch, Stage};

use crate::stages::{unexpected_payload, StageRunner};
use crate::traits::RecordStore;
use crate::verification::ClaimVerifier;

pub struct AnalysisStage {
    verifier: Arc<ClaimVerifier>,
    store: Arc<dyn RecordStore>,
}

impl AnalysisStage {
    pub fn new(verifier: Arc<ClaimVerifier>, store: Arc<dyn RecordStore>) -> Self {
        Self { verifier, store }
    }
}

#[async_trait]
impl StageRunner for AnalysisStage {
    fn stage(&self) -> Stage {
        Stage::DisinformationAnalysis
    }

    async fn run(&self, envelope: Envelope) -> Result<Payload, FactCheckError> {
        let scored = match envelope.data {
            Payload::DeepfakeScored(scored) => scored,
            other => return Err(unexpected_payload(self.stage(), &other)),
        };
        let request_id = scored.request().request_id.clone();

        let verification = self.verifier.verify(&scored).await?;
        let analyzed = AnalyzedClaim {
            analysis_message: verification.messages.join("\n"),
            scored,
            subclaims: verification.subclaims,
            news: verification.news,
            messages: verification.messages,
            risk: verification.risk,
        };

        let patch = RecordPatch {
            subclaims: Some(analyzed.subclaims.clone()),
            news: Some(analyzed.news.clone()),
            messages: Some(analyzed.messages.clone()),
            analysis_message: Some(analyzed.analysis_message.clone()),
            ..RecordPatch::default()
        };
        self.store
            .update(&request_id, &patch)
            .await
            .map_err(|e| FactCheckError::Persistence(e.to_string()))?;

        Ok(Payload::Analyzed(analyzed))
    }
}
