use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactCheckError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl FactCheckError {
    /// Validation failures are raised before any external call.
    pub fn is_validation(&self) -> bool {
        matches!(self, FactCheckError::Validation(_))
    }
}
