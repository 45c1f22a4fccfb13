// Trait abstractions for the pipeline's external collaborators.
//
// Every stage talks to the outside world through one of these. Production
// adapters live at the bottom of this file; deterministic mocks live in
// `testing.rs`, so the whole chain runs in tests with no network, no
// database and no media on disk.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use ai_client::{Agent, Gemini, PromptBuilder, UploadedFile};
use factcheck_common::{RecordPatch, RequestRecord};
use instagram::InstagramService;
use news_client::{Article, GoogleNewsClient, NewsApiClient};

// ---------------------------------------------------------------------------
// Media handles
// ---------------------------------------------------------------------------

/// A downloaded video on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub path: PathBuf,
}

impl MediaHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &'static str {
        match self.path.extension().and_then(|e| e.to_str()) {
            Some("mov") => "video/quicktime",
            Some("webm") => "video/webm",
            _ => "video/mp4",
        }
    }
}

/// A media file made available to a `MediaPrompter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMedia {
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

// ---------------------------------------------------------------------------
// TextGenerator
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Single-turn completion. An empty string is a valid (if useless) answer.
    async fn generate(&self, prompt: &str, temperature: Option<f32>) -> Result<String>;
}

// ---------------------------------------------------------------------------
// MediaPrompter: prompts over a video
// ---------------------------------------------------------------------------

#[async_trait]
pub trait MediaPrompter: Send + Sync {
    /// Make the media available for prompting. May block until the provider
    /// has finished processing it.
    async fn upload(&self, media: &MediaHandle) -> Result<RemoteMedia>;

    async fn ask(&self, media: &RemoteMedia, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// EvidenceSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Name recorded as `source` on matched articles.
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<Article>>;
}

// ---------------------------------------------------------------------------
// RecordStore: the request document store
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Insert `record` only when no record exists for `id`, atomically.
    /// Returns `false` when one already did.
    async fn create_if_absent(&self, id: &str, record: &RequestRecord) -> Result<bool>;

    /// Create or replace the whole record.
    async fn write(&self, id: &str, record: &RequestRecord) -> Result<()>;

    /// Merge `patch` into an existing record.
    async fn update(&self, id: &str, patch: &RecordPatch) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<RequestRecord>>;
}

// ---------------------------------------------------------------------------
// MediaDownloader / ManipulationScorer / MessageSender
// ---------------------------------------------------------------------------

#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, request_id: &str, url: &str) -> Result<MediaHandle>;
}

#[async_trait]
pub trait ManipulationScorer: Send + Sync {
    /// Returns `(video_fake_prob, audio_fake_prob)`. Range checking is the
    /// caller's job.
    async fn score(&self, media: &MediaHandle) -> Result<(f64, f64)>;
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send one message. Callers chunk long text first.
    async fn send(&self, user_id: &str, text: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Production adapters
// ---------------------------------------------------------------------------

#[async_trait]
impl TextGenerator for Gemini {
    async fn generate(&self, prompt: &str, temperature: Option<f32>) -> Result<String> {
        let mut builder = Agent::prompt(self, prompt);
        if let Some(t) = temperature {
            builder = builder.temperature(t);
        }
        builder.send().await
    }
}

#[async_trait]
impl MediaPrompter for Gemini {
    async fn upload(&self, media: &MediaHandle) -> Result<RemoteMedia> {
        let file = self.upload_file(media.path(), media.mime_type()).await?;
        Ok(RemoteMedia {
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type,
        })
    }

    async fn ask(&self, media: &RemoteMedia, prompt: &str) -> Result<String> {
        let file = UploadedFile {
            name: media.name.clone(),
            uri: media.uri.clone(),
            mime_type: media.mime_type.clone(),
        };
        self.prompt_with_file(&file, prompt).await
    }
}

#[async_trait]
impl EvidenceSource for GoogleNewsClient {
    fn name(&self) -> &str {
        "GoogleNews"
    }

    async fn search(&self, query: &str) -> Result<Vec<Article>> {
        Ok(GoogleNewsClient::search(self, query).await?)
    }
}

#[async_trait]
impl EvidenceSource for NewsApiClient {
    fn name(&self) -> &str {
        "NewsAPI"
    }

    async fn search(&self, query: &str) -> Result<Vec<Article>> {
        Ok(NewsApiClient::search(self, query).await?)
    }
}

#[async_trait]
impl MessageSender for InstagramService {
    async fn send(&self, user_id: &str, text: &str) -> Result<()> {
        self.send_text(user_id, text).await?;
        Ok(())
    }
}
