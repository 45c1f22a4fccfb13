//! Topics and the typed payloads carried between pipeline stages.
//!
//! Each stage receives the previous stage's payload by value and wraps it, so
//! a field set upstream can only be read downstream, never overwritten.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FactCheckError;
use crate::types::{ManipulationScores, NewsArticle, RequestRecord, RiskLevel, Subclaim};

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ReelsDownload,
    ClaimExtraction,
    DeepfakeDetection,
    DisinformationAnalysis,
    MessageDelivery,
    RelatedNews,
    ProcessingMessage,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::ReelsDownload,
        Stage::ClaimExtraction,
        Stage::DeepfakeDetection,
        Stage::DisinformationAnalysis,
        Stage::MessageDelivery,
        Stage::RelatedNews,
        Stage::ProcessingMessage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::ReelsDownload => "reels_download",
            Stage::ClaimExtraction => "claim_extraction",
            Stage::DeepfakeDetection => "deepfake_detection",
            Stage::DisinformationAnalysis => "disinformation_analysis",
            Stage::MessageDelivery => "message_delivery",
            Stage::RelatedNews => "related_news",
            Stage::ProcessingMessage => "processing_message",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKind {
    Run,
    Completed,
    Failed,
}

impl TopicKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TopicKind::Run => "run",
            TopicKind::Completed => "completed",
            TopicKind::Failed => "failed",
        }
    }
}

/// `<stage>.<kind>`, e.g. `claim_extraction.completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic {
    pub stage: Stage,
    pub kind: TopicKind,
}

impl Topic {
    pub const fn new(stage: Stage, kind: TopicKind) -> Self {
        Self { stage, kind }
    }

    pub const fn run(stage: Stage) -> Self {
        Self::new(stage, TopicKind::Run)
    }

    pub const fn completed(stage: Stage) -> Self {
        Self::new(stage, TopicKind::Completed)
    }

    pub const fn failed(stage: Stage) -> Self {
        Self::new(stage, TopicKind::Failed)
    }

    pub fn is_failure(&self) -> bool {
        self.kind == TopicKind::Failed
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stage.as_str(), self.kind.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stage, kind) = s
            .rsplit_once('.')
            .ok_or_else(|| format!("topic without kind: {s}"))?;
        let stage = Stage::ALL
            .into_iter()
            .find(|st| st.as_str() == stage)
            .ok_or_else(|| format!("unknown stage: {stage}"))?;
        let kind = match kind {
            "run" => TopicKind::Run,
            "completed" => TopicKind::Completed,
            "failed" => TopicKind::Failed,
            other => return Err(format!("unknown topic kind: {other}")),
        };
        Ok(Topic::new(stage, kind))
    }
}

impl TryFrom<String> for Topic {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> String {
        topic.to_string()
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// The verified inbound record handed over by the webhook boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub data: InboundData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundData {
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub video_text: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl InboundEvent {
    /// Upstream message id, then video id, then a fresh uuid.
    pub fn request_id(&self) -> String {
        non_empty(self.id.as_deref())
            .or_else(|| non_empty(self.data.video_id.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Validate required fields and resolve the request id.
    pub fn into_request(self) -> Result<InboundRequest, FactCheckError> {
        let request_id = self.request_id();
        let InboundData {
            video_url,
            user_id,
            video_text,
            video_id,
        } = self.data;
        if video_url.trim().is_empty() {
            return Err(FactCheckError::Validation("videoUrl is required".into()));
        }
        if user_id.trim().is_empty() {
            return Err(FactCheckError::Validation("userId is required".into()));
        }
        // The id names the downloaded media file.
        if request_id.contains(['/', '\\']) || request_id.contains("..") {
            return Err(FactCheckError::Validation(format!(
                "request id {request_id:?} must not contain path segments"
            )));
        }
        Ok(InboundRequest {
            request_id,
            user_id,
            video_url,
            video_id,
            video_text: video_text.filter(|t| !t.trim().is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// Stage payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundRequest {
    pub request_id: String,
    pub user_id: String,
    pub video_url: String,
    pub video_id: Option<String>,
    pub video_text: Option<String>,
}

impl InboundRequest {
    pub fn to_record(&self) -> RequestRecord {
        RequestRecord {
            user_id: self.user_id.clone(),
            video_url: self.video_url.clone(),
            video_id: self.video_id.clone(),
            video_text: self.video_text.clone(),
            ..RequestRecord::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadedVideo {
    pub request: InboundRequest,
    pub video_path: String,
}

impl DownloadedVideo {
    pub fn to_record(&self) -> RequestRecord {
        RequestRecord {
            video_path: self.video_path.clone(),
            ..self.request.to_record()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedClaim {
    pub video: DownloadedVideo,
    pub claim: String,
    pub context: String,
}

impl ExtractedClaim {
    pub fn request(&self) -> &InboundRequest {
        &self.video.request
    }

    pub fn to_record(&self) -> RequestRecord {
        RequestRecord {
            claim: self.claim.clone(),
            context: self.context.clone(),
            ..self.video.to_record()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredClaim {
    pub extracted: ExtractedClaim,
    pub scores: ManipulationScores,
}

impl ScoredClaim {
    pub fn request(&self) -> &InboundRequest {
        self.extracted.request()
    }

    pub fn to_record(&self) -> RequestRecord {
        RequestRecord {
            prob_video_fake: self.scores.video,
            prob_audio_fake: self.scores.audio,
            ..self.extracted.to_record()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedClaim {
    pub scored: ScoredClaim,
    pub subclaims: Vec<Subclaim>,
    pub news: Vec<NewsArticle>,
    pub messages: Vec<String>,
    pub analysis_message: String,
    pub risk: Option<RiskLevel>,
}

impl AnalyzedClaim {
    pub fn request(&self) -> &InboundRequest {
        self.scored.request()
    }

    pub fn to_record(&self) -> RequestRecord {
        RequestRecord {
            subclaims: self.subclaims.clone(),
            news: self.news.clone(),
            messages: self.messages.clone(),
            analysis_message: self.analysis_message.clone(),
            ..self.scored.to_record()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredAnalysis {
    pub analysis: AnalyzedClaim,
    pub chunks_sent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One closed variant per kind of data a topic can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Inbound(InboundRequest),
    Downloaded(DownloadedVideo),
    ClaimExtracted(ExtractedClaim),
    DeepfakeScored(ScoredClaim),
    Analyzed(AnalyzedClaim),
    Delivered(DeliveredAnalysis),
    RelatedNewsSent { count: usize },
    Acknowledged,
    Failed(StageFailure),
}

impl Payload {
    /// Persistence projection of the accumulated record, when the payload
    /// carries one.
    pub fn record(&self) -> Option<RequestRecord> {
        match self {
            Payload::Inbound(p) => Some(p.to_record()),
            Payload::Downloaded(p) => Some(p.to_record()),
            Payload::ClaimExtracted(p) => Some(p.to_record()),
            Payload::DeepfakeScored(p) => Some(p.to_record()),
            Payload::Analyzed(p) => Some(p.to_record()),
            Payload::Delivered(p) => Some(p.analysis.to_record()),
            Payload::RelatedNewsSent { .. } | Payload::Acknowledged | Payload::Failed(_) => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Payload::Inbound(_) => "inbound",
            Payload::Downloaded(_) => "downloaded",
            Payload::ClaimExtracted(_) => "claim_extracted",
            Payload::DeepfakeScored(_) => "deepfake_scored",
            Payload::Analyzed(_) => "analyzed",
            Payload::Delivered(_) => "delivered",
            Payload::RelatedNewsSent { .. } => "related_news_sent",
            Payload::Acknowledged => "acknowledged",
            Payload::Failed(_) => "failed",
        }
    }
}

/// Every event carries the request id so late stages can always correlate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: Topic,
    pub id: String,
    pub data: Payload,
}

impl Envelope {
    pub fn new(topic: Topic, id: impl Into<String>, data: Payload) -> Self {
        Self {
            topic,
            id: id.into(),
            data,
        }
    }

    pub fn failed(stage: Stage, id: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::new(
            Topic::failed(stage),
            id,
            Payload::Failed(StageFailure {
                error: error.to_string(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Probability;

    fn inbound(id: Option<&str>, video_id: Option<&str>) -> InboundEvent {
        InboundEvent {
            id: id.map(String::from),
            data: InboundData {
                video_url: "https://x/v.mp4".into(),
                user_id: "u1".into(),
                video_text: None,
                video_id: video_id.map(String::from),
            },
        }
    }

    #[test]
    fn topic_display_and_parse_agree() {
        for stage in Stage::ALL {
            for topic in [Topic::run(stage), Topic::completed(stage), Topic::failed(stage)] {
                assert_eq!(topic.to_string().parse::<Topic>().unwrap(), topic);
            }
        }
        assert_eq!(
            Topic::completed(Stage::ReelsDownload).to_string(),
            "reels_download.completed"
        );
        assert!("reels_download.done".parse::<Topic>().is_err());
        assert!("unknown.run".parse::<Topic>().is_err());
    }

    #[test]
    fn request_id_prefers_message_id_then_video_id() {
        assert_eq!(inbound(Some("m1"), Some("v1")).request_id(), "m1");
        assert_eq!(inbound(None, Some("v1")).request_id(), "v1");
        assert_eq!(inbound(Some(" "), Some("v1")).request_id(), "v1");

        let generated = inbound(None, None).request_id();
        assert!(Uuid::parse_str(&generated).is_ok());
    }

    #[test]
    fn into_request_rejects_missing_fields() {
        let mut event = inbound(Some("r1"), None);
        event.data.video_url.clear();
        let err = event.into_request().unwrap_err();
        assert!(err.is_validation());

        let mut event = inbound(Some("r1"), None);
        event.data.user_id = "  ".into();
        assert!(event.into_request().unwrap_err().is_validation());
    }

    #[test]
    fn path_like_request_ids_are_rejected() {
        for id in ["../../etc/evil", "a/b", "a\\b", ".."] {
            let err = inbound(Some(id), None).into_request().unwrap_err();
            assert!(err.is_validation(), "{id} accepted");
        }

        let err = inbound(None, Some("../vid")).into_request().unwrap_err();
        assert!(err.is_validation());

        assert!(inbound(Some("msg.123-abc"), None).into_request().is_ok());
    }

    #[test]
    fn inbound_event_parses_camel_case_wire_shape() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"id":"r1","data":{"videoUrl":"https://x/v.mp4","userId":"u1","videoText":"caption"}}"#,
        )
        .unwrap();
        let request = event.into_request().unwrap();
        assert_eq!(request.request_id, "r1");
        assert_eq!(request.video_text.as_deref(), Some("caption"));
    }

    #[test]
    fn record_projection_accumulates_fields() {
        let request = inbound(Some("r1"), None).into_request().unwrap();
        let scored = ScoredClaim {
            extracted: ExtractedClaim {
                video: DownloadedVideo {
                    request,
                    video_path: "data/requests/r1.mp4".into(),
                },
                claim: "Lula signs decree".into(),
                context: "A speech".into(),
            },
            scores: ManipulationScores::new(
                Probability::new(0.2).unwrap(),
                Probability::new(0.1).unwrap(),
            ),
        };

        let record = Payload::DeepfakeScored(scored).record().unwrap();
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.video_path, "data/requests/r1.mp4");
        assert_eq!(record.claim, "Lula signs decree");
        assert_eq!(record.prob_video_fake.map(|p| p.value()), Some(0.2));
        assert!(record.messages.is_empty());

        assert!(Payload::Acknowledged.record().is_none());
    }

    #[test]
    fn failed_envelope_carries_id_and_error() {
        let envelope = Envelope::failed(Stage::ClaimExtraction, "r1", "boom");
        assert!(envelope.topic.is_failure());
        assert_eq!(envelope.id, "r1");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["topic"], "claim_extraction.failed");
        assert_eq!(json["data"]["error"], "boom");
    }
}
