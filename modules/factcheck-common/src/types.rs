use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Probability
// ---------------------------------------------------------------------------

/// A probability in [0, 1]. Construction rejects NaN and out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Probability(f64);

impl Probability {
    pub fn new(value: f64) -> Option<Self> {
        (0.0..=1.0).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Probability {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Probability::new(value).ok_or_else(|| format!("probability out of range: {value}"))
    }
}

impl From<Probability> for f64 {
    fn from(p: Probability) -> f64 {
        p.0
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Manipulation scores
// ---------------------------------------------------------------------------

/// Video and audio manipulation probabilities. `None` until scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ManipulationScores {
    pub video: Option<Probability>,
    pub audio: Option<Probability>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManipulationVerdict {
    Fake,
    Inconclusive,
    Real,
}

const VIDEO_WEIGHT: f64 = 0.6;
const AUDIO_WEIGHT: f64 = 0.4;
const FAKE_THRESHOLD: f64 = 0.8;
const INCONCLUSIVE_THRESHOLD: f64 = 0.4;

impl ManipulationScores {
    pub fn new(video: Probability, audio: Probability) -> Self {
        Self {
            video: Some(video),
            audio: Some(audio),
        }
    }

    /// Weighted video/audio score. Only defined once both are known.
    pub fn combined(&self) -> Option<f64> {
        Some(self.video?.value() * VIDEO_WEIGHT + self.audio?.value() * AUDIO_WEIGHT)
    }

    /// A strong video signal alone is enough to call the media fake.
    pub fn verdict(&self) -> Option<ManipulationVerdict> {
        let video = self.video?.value();
        let combined = self.combined()?;
        Some(if video >= FAKE_THRESHOLD || combined >= FAKE_THRESHOLD {
            ManipulationVerdict::Fake
        } else if combined >= INCONCLUSIVE_THRESHOLD {
            ManipulationVerdict::Inconclusive
        } else {
            ManipulationVerdict::Real
        })
    }
}

// ---------------------------------------------------------------------------
// Verification verdicts
// ---------------------------------------------------------------------------

/// The closed set of verdicts a sub-claim can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationResult {
    #[serde(rename = "Supported-Beyond-Context")]
    SupportedBeyondContext,
    #[serde(rename = "Potentially-Supported-Beyond-Context")]
    PotentiallySupportedBeyondContext,
    #[serde(rename = "Supported-By-Context-Only")]
    SupportedByContextOnly,
    #[serde(rename = "Weakly-Supported-By-Context")]
    WeaklySupportedByContext,
    #[serde(rename = "Refuted-By-Context")]
    RefutedByContext,
    #[serde(rename = "Refuted-Beyond-Context")]
    RefutedBeyondContext,
    #[serde(rename = "Not-Verifiable")]
    NotVerifiable,
}

impl VerificationResult {
    pub const ALL: [VerificationResult; 7] = [
        VerificationResult::SupportedBeyondContext,
        VerificationResult::PotentiallySupportedBeyondContext,
        VerificationResult::SupportedByContextOnly,
        VerificationResult::WeaklySupportedByContext,
        VerificationResult::RefutedByContext,
        VerificationResult::RefutedBeyondContext,
        VerificationResult::NotVerifiable,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VerificationResult::SupportedBeyondContext => "Supported-Beyond-Context",
            VerificationResult::PotentiallySupportedBeyondContext => {
                "Potentially-Supported-Beyond-Context"
            }
            VerificationResult::SupportedByContextOnly => "Supported-By-Context-Only",
            VerificationResult::WeaklySupportedByContext => "Weakly-Supported-By-Context",
            VerificationResult::RefutedByContext => "Refuted-By-Context",
            VerificationResult::RefutedBeyondContext => "Refuted-Beyond-Context",
            VerificationResult::NotVerifiable => "Not-Verifiable",
        }
    }

    /// Map free model output onto the closed set. Case, surrounding markdown
    /// emphasis and trailing punctuation are tolerated; anything else is
    /// `NotVerifiable`.
    pub fn from_label(raw: &str) -> Self {
        let cleaned = raw
            .trim()
            .trim_matches(|c: char| {
                matches!(c, '*' | '_' | '`' | '"' | '\'' | '[' | ']' | '.' | ',' | ';' | '!' | ':')
                    || c.is_whitespace()
            });
        Self::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(cleaned))
            .unwrap_or(VerificationResult::NotVerifiable)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Subclaim
// ---------------------------------------------------------------------------

/// Maximum number of search terms kept per sub-claim.
pub const MAX_QUERY_TERMS: usize = 3;

/// One minimal, independently verifiable assertion derived from a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subclaim {
    pub claim_text: String,
    pub evidence_types: Vec<String>,
    pub query: Vec<String>,
    pub verification_result: Option<VerificationResult>,
    pub justification: Option<String>,
}

impl Subclaim {
    pub fn new(claim_text: impl Into<String>, evidence_types: Vec<String>, mut query: Vec<String>) -> Self {
        query.truncate(MAX_QUERY_TERMS);
        Self {
            claim_text: claim_text.into(),
            evidence_types,
            query,
            verification_result: None,
            justification: None,
        }
    }

    /// Record the judgment. A sub-claim is judged at most once; a second call
    /// is ignored and returns false.
    pub fn record_verdict(&mut self, result: VerificationResult, justification: Option<String>) -> bool {
        if self.verification_result.is_some() {
            return false;
        }
        self.verification_result = Some(result);
        self.justification = justification;
        true
    }
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

/// A scored evidence article. Identity is the `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub source: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub score: f64,
    pub query: String,
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Recognizes the English labels plus the Portuguese ones the model uses
    /// when answering in Portuguese.
    pub fn parse(raw: &str) -> Option<Self> {
        let word = raw
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match word.as_str() {
            "high" | "alto" => Some(RiskLevel::High),
            "medium" | "médio" | "medio" => Some(RiskLevel::Medium),
            "low" | "baixo" => Some(RiskLevel::Low),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Request record (persistence projection)
// ---------------------------------------------------------------------------

/// Flat document persisted per request. Stage payloads project into this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub user_id: String,
    pub video_url: String,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub video_path: String,
    #[serde(default)]
    pub video_text: Option<String>,
    #[serde(default)]
    pub claim: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub prob_video_fake: Option<Probability>,
    #[serde(default)]
    pub prob_audio_fake: Option<Probability>,
    #[serde(default)]
    pub subclaims: Vec<Subclaim>,
    #[serde(default)]
    pub news: Vec<NewsArticle>,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub analysis_message: String,
}

/// Partial update of a persisted record. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prob_video_fake: Option<Probability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prob_audio_fake: Option<Probability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subclaims: Option<Vec<Subclaim>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news: Option<Vec<NewsArticle>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_message: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == RecordPatch::default()
    }
}
