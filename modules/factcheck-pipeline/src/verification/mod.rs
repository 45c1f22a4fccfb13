//! Claim verification: decompose → retrieve evidence → judge → synthesize.
//!
//! Runs inside the disinformation analysis stage without going back through
//! the bus. Only a failing text generator during decomposition is fatal;
//! judging and synthesis degrade to fixed text instead.

pub mod parse;
pub mod prompts;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use factcheck_common::{FactCheckError, NewsArticle, RiskLevel, ScoredClaim, Subclaim, VerificationResult};

use crate::evidence::EvidenceMatcher;
use crate::traits::TextGenerator;

pub use parse::Synthesis;

/// Low temperature keeps verdict labels inside the closed set.
const JUDGMENT_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Number of sub-claims requested from the generator.
    pub subclaim_count: usize,
    /// Language the final user-facing lines are written in.
    pub response_language: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            subclaim_count: 2,
            response_language: "Brazilian Portuguese".to_string(),
        }
    }
}

/// Forward-only progress of one verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Decomposing,
    RetrievingEvidence,
    Judging,
    Synthesizing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Decomposing => "decomposing",
            Phase::RetrievingEvidence => "retrieving_evidence",
            Phase::Judging => "judging",
            Phase::Synthesizing => "synthesizing",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Everything verification adds to a scored claim.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub subclaims: Vec<Subclaim>,
    pub news: Vec<NewsArticle>,
    pub messages: Vec<String>,
    pub risk: Option<RiskLevel>,
}

pub struct ClaimVerifier {
    generator: Arc<dyn TextGenerator>,
    matcher: Arc<EvidenceMatcher>,
    config: VerifierConfig,
}

impl ClaimVerifier {
    pub fn new(generator: Arc<dyn TextGenerator>, matcher: Arc<EvidenceMatcher>, config: VerifierConfig) -> Self {
        Self {
            generator,
            matcher,
            config,
        }
    }

    pub async fn verify(&self, scored: &ScoredClaim) -> Result<Verification, FactCheckError> {
        let request_id = scored.request().request_id.as_str();
        let claim = scored.extracted.claim.as_str();
        let context = scored.extracted.context.as_str();

        let mut phase = Phase::Decomposing;
        debug!(request_id, %phase, "Verification phase");
        let mut subclaims = self.decompose(claim, context).await?;
        info!(request_id, count = subclaims.len(), requested = self.config.subclaim_count, "Claim decomposed");

        phase = advance(request_id, phase, Phase::RetrievingEvidence);
        let news = self.retrieve(&subclaims).await;

        phase = advance(request_id, phase, Phase::Judging);
        self.judge(request_id, scored, &news, &mut subclaims).await;

        phase = advance(request_id, phase, Phase::Synthesizing);
        let synthesis = self.synthesize(request_id, claim, &subclaims).await;

        advance(request_id, phase, Phase::Done);
        Ok(Verification {
            subclaims,
            news,
            messages: synthesis.messages,
            risk: synthesis.risk,
        })
    }

    async fn decompose(&self, claim: &str, context: &str) -> Result<Vec<Subclaim>, FactCheckError> {
        if claim.trim().is_empty() {
            return Err(FactCheckError::Validation("claim is empty".into()));
        }
        let prompt = prompts::decomposition(claim, context, self.config.subclaim_count);
        let raw = self
            .generator
            .generate(&prompt, None)
            .await
            .map_err(|e| FactCheckError::Generation(format!("decomposition: {e}")))?;
        Ok(parse::subclaims(&raw, self.config.subclaim_count))
    }

    /// One matcher run per sub-claim; results are concatenated as-is.
    async fn retrieve(&self, subclaims: &[Subclaim]) -> Vec<NewsArticle> {
        let mut news = Vec::new();
        for subclaim in subclaims {
            news.extend(self.matcher.run(&subclaim.query).await);
        }
        news
    }

    async fn judge(&self, request_id: &str, scored: &ScoredClaim, news: &[NewsArticle], subclaims: &mut [Subclaim]) {
        if subclaims.is_empty() {
            debug!(request_id, "No sub-claims to judge");
            return;
        }

        let prompt = prompts::judgment(
            &scored.extracted.context,
            scored.request().video_text.as_deref(),
            &scored.scores,
            news,
            subclaims,
        );
        let verdicts = match self.generator.generate(&prompt, Some(JUDGMENT_TEMPERATURE)).await {
            Ok(raw) => parse::verdicts(&raw),
            Err(e) => {
                warn!(request_id, error = %e, "Judgment generation failed");
                Vec::new()
            }
        };

        if verdicts.is_empty() {
            warn!(request_id, "No usable verdicts, marking every sub-claim not verifiable");
            for subclaim in subclaims.iter_mut() {
                subclaim.record_verdict(
                    VerificationResult::NotVerifiable,
                    Some(parse::JUDGMENT_FALLBACK.to_string()),
                );
            }
            return;
        }

        if verdicts.len() != subclaims.len() {
            warn!(request_id, verdicts = verdicts.len(), subclaims = subclaims.len(), "Verdict count mismatch");
        }
        for (subclaim, (result, justification)) in subclaims.iter_mut().zip(verdicts) {
            subclaim.record_verdict(result, justification);
        }
    }

    async fn synthesize(&self, request_id: &str, claim: &str, subclaims: &[Subclaim]) -> Synthesis {
        let prompt = prompts::synthesis(claim, subclaims, &self.config.response_language);
        let raw = match self.generator.generate(&prompt, None).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(request_id, error = %e, "Synthesis generation failed");
                String::new()
            }
        };
        let synthesis = parse::synthesis(&raw);
        info!(request_id, lines = synthesis.messages.len(), risk = ?synthesis.risk, "Verdict synthesized");
        synthesis
    }
}

fn advance(request_id: &str, from: Phase, to: Phase) -> Phase {
    debug_assert!(to > from, "verification phases only move forward");
    debug!(request_id, %from, phase = %to, "Verification phase");
    to
}
