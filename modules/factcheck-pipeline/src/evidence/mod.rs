pub mod matcher;
pub mod similarity;
pub mod stopwords;

pub use matcher::{EvidenceMatcher, MatcherConfig};
