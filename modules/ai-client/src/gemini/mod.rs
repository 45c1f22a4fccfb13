mod client;
pub mod prompt_builder;
pub(crate) mod types;

pub use prompt_builder::GeminiPromptBuilder;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::error::AiError;
use crate::traits::{Agent, MediaRef, PromptBuilder};
use client::GeminiClient;

/// Upper bound on server-side processing of an uploaded media file.
const FILE_PROCESSING_TIMEOUT: Duration = Duration::from_secs(300);
const FILE_POLL_INTERVAL: Duration = Duration::from_secs(2);

// =============================================================================
// Gemini Agent
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
}

/// A media file that finished processing on the Gemini side and can be
/// referenced from prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

impl UploadedFile {
    pub fn media_ref(&self) -> MediaRef {
        MediaRef::new(&self.uri, &self.mime_type)
    }
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    /// Upload a local media file and wait until it is usable in prompts.
    pub async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<UploadedFile> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AiError::FileProcessing(format!("{}: {e}", path.display())))?;
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        info!(path = %path.display(), bytes = bytes.len(), "Uploading media to Gemini");

        let client = self.client();
        let file = client.upload(&display_name, mime_type, bytes).await?;
        let file = client
            .wait_until_active(file, FILE_PROCESSING_TIMEOUT, FILE_POLL_INTERVAL)
            .await?;

        Ok(UploadedFile {
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type,
        })
    }

    /// Single-turn prompt over an uploaded file. No text back is an error.
    pub async fn prompt_with_file(&self, file: &UploadedFile, prompt: &str) -> Result<String> {
        let text = self.prompt(prompt).attach(file.media_ref()).send().await?;
        if text.is_empty() {
            return Err(AiError::EmptyResponse(format!("no text for file {}", file.name)).into());
        }
        Ok(text)
    }
}

impl Agent for Gemini {
    type PromptBuilder = GeminiPromptBuilder;

    fn prompt(&self, input: impl Into<String>) -> Self::PromptBuilder {
        GeminiPromptBuilder::new(self.clone(), input.into())
    }
}
