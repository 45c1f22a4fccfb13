pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::Config;
pub use error::FactCheckError;
pub use events::{
    AnalyzedClaim, DeliveredAnalysis, DownloadedVideo, Envelope, ExtractedClaim, InboundData,
    InboundEvent, InboundRequest, Payload, ScoredClaim, Stage, StageFailure, Topic, TopicKind,
};
pub use types::{
    ManipulationScores, ManipulationVerdict, NewsArticle, Probability, RecordPatch, RequestRecord,
    RiskLevel, Subclaim, VerificationResult,
};
