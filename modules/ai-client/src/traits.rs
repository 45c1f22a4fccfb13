use anyhow::Result;
use async_trait::async_trait;

/// Media already uploaded to a provider, referenced by URI from prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub uri: String,
    pub mime_type: String,
}

impl MediaRef {
    pub fn new(uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
        }
    }
}

// =============================================================================
// Agent Trait
// =============================================================================

/// A model endpoint that answers single-turn prompts.
pub trait Agent: Clone + Send + Sync {
    type PromptBuilder: PromptBuilder;

    fn prompt(&self, input: impl Into<String>) -> Self::PromptBuilder;
}

// =============================================================================
// PromptBuilder Trait
// =============================================================================

#[async_trait]
pub trait PromptBuilder: Send + Sized {
    /// System instruction sent ahead of the prompt.
    fn preamble(self, preamble: impl Into<String>) -> Self;

    fn temperature(self, temperature: f32) -> Self;

    /// Attach media to the prompt. Media parts precede the text input.
    fn attach(self, media: MediaRef) -> Self;

    /// Send the prompt. An empty string means the model produced no text.
    async fn send(self) -> Result<String>;
}
