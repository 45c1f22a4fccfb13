// Test mocks for the fact-checking pipeline.
//
// One mock per collaborator trait:
// - ScriptedGenerator (TextGenerator): queued replies, consumed in order
// - ScriptedPrompter (MediaPrompter): queued replies over a fake upload
// - MockEvidenceSource (EvidenceSource): HashMap-based query→articles
// - StubDownloader (MediaDownloader): fixed path, optional failure
// - StubScorer (ManipulationScorer): fixed probabilities
// - RecordingSender (MessageSender): records every message sent
// MemoryRecordStore (RecordStore) lives in `store.rs` and doubles as a mock.
//
// Plus constructors for payloads at each stage of the chain.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use factcheck_common::{
    AnalyzedClaim, DownloadedVideo, ExtractedClaim, InboundRequest, ManipulationScores, NewsArticle,
    Probability, RequestRecord, ScoredClaim,
};
use news_client::Article;

use crate::traits::{
    EvidenceSource, ManipulationScorer, MediaDownloader, MediaHandle, MediaPrompter, MessageSender,
    RemoteMedia, TextGenerator,
};

pub use crate::store::MemoryRecordStore;

// ---------------------------------------------------------------------------
// Canned model output
// ---------------------------------------------------------------------------

/// Two well-formed sub-claim blocks. The first queries "Lula decreto".
pub const TWO_SUBCLAIMS: &str = "Subclaim: Lula signed a decree\n\
Evidence: official gazette, press coverage\n\
Query: Lula decreto\n\
\n\
Subclaim: The decree changes food prices\n\
Evidence: price statistics\n\
Query: preço alimentos decreto";

pub const THREE_LINE_SYNTHESIS: &str = "Risk: Low - the decree is documented\n\
Evidence 1: Major outlets report the decree was signed.\n\
Evidence 2: No sign of audio or video manipulation.";

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

/// Replies are consumed in order. Running out of replies is an error, so a
/// test notices an unexpected extra call.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(error.to_string()));
        self
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _temperature: Option<f32>) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow!(e)),
            None => bail!("ScriptedGenerator: no reply scripted for call {}", self.calls()),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedPrompter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedPrompter {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    uploads: AtomicUsize,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(error.to_string()));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaPrompter for ScriptedPrompter {
    async fn upload(&self, media: &MediaHandle) -> Result<RemoteMedia> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(RemoteMedia {
            name: "files/test".to_string(),
            uri: format!("mock://{}", media.path().display()),
            mime_type: media.mime_type().to_string(),
        })
    }

    async fn ask(&self, _media: &RemoteMedia, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow!(e)),
            None => bail!("ScriptedPrompter: no reply scripted"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockEvidenceSource
// ---------------------------------------------------------------------------

/// Query→articles map. Unregistered queries return no articles, like a real
/// search with no hits. `.failing()` makes every search an error.
pub struct MockEvidenceSource {
    name: String,
    results: HashMap<String, Vec<Article>>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl MockEvidenceSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            results: HashMap::new(),
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn on_query(mut self, query: &str, articles: Vec<Article>) -> Self {
        self.results.insert(query.to_string(), articles);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvidenceSource for MockEvidenceSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str) -> Result<Vec<Article>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            bail!("MockEvidenceSource {}: search failed", self.name);
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// StubDownloader
// ---------------------------------------------------------------------------

/// Pretends to download into `<dir>/<request_id>.mp4` without touching disk.
pub struct StubDownloader {
    dir: PathBuf,
    fail: bool,
    calls: AtomicUsize,
}

impl StubDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDownloader for StubDownloader {
    async fn download(&self, request_id: &str, url: &str) -> Result<MediaHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("StubDownloader: cannot fetch {url}");
        }
        Ok(MediaHandle::new(self.dir.join(format!("{request_id}.mp4"))))
    }
}

// ---------------------------------------------------------------------------
// StubScorer
// ---------------------------------------------------------------------------

pub struct StubScorer {
    scores: Option<(f64, f64)>,
    calls: AtomicUsize,
}

impl StubScorer {
    pub fn new(video: f64, audio: f64) -> Self {
        Self {
            scores: Some((video, audio)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            scores: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManipulationScorer for StubScorer {
    async fn score(&self, _media: &MediaHandle) -> Result<(f64, f64)> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scores.ok_or_else(|| anyhow!("StubScorer: model unavailable"))
    }
}

// ---------------------------------------------------------------------------
// RecordingSender
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// `(user_id, text)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, t)| t).collect()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, user_id: &str, text: &str) -> Result<()> {
        if self.fail {
            bail!("RecordingSender: delivery refused");
        }
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Payload constructors
// ---------------------------------------------------------------------------

/// A search hit with no publisher, so the matcher names it after its source.
pub fn article(url: &str, title: &str, description: &str) -> Article {
    Article {
        title: title.to_string(),
        description: description.to_string(),
        url: url.to_string(),
        publisher: None,
        published_at: None,
    }
}

pub fn news_article(url: &str, title: &str) -> NewsArticle {
    NewsArticle {
        source: "GoogleNews".to_string(),
        title: title.to_string(),
        description: String::new(),
        url: url.to_string(),
        score: 0.5,
        query: "Lula decreto".to_string(),
    }
}

pub fn inbound_request(id: &str) -> InboundRequest {
    InboundRequest {
        request_id: id.to_string(),
        user_id: "u1".to_string(),
        video_url: "https://x/v.mp4".to_string(),
        video_id: None,
        video_text: None,
    }
}

pub fn downloaded_video(id: &str) -> DownloadedVideo {
    DownloadedVideo {
        request: inbound_request(id),
        video_path: format!("/tmp/media/{id}.mp4"),
    }
}

pub fn extracted_claim(id: &str, claim: &str) -> ExtractedClaim {
    ExtractedClaim {
        video: downloaded_video(id),
        claim: claim.to_string(),
        context: "A politician announces a decree in a short video.".to_string(),
    }
}

pub fn scored_claim(id: &str, claim: &str) -> ScoredClaim {
    ScoredClaim {
        extracted: extracted_claim(id, claim),
        scores: ManipulationScores::new(
            Probability::new(0.2).expect("valid probability"),
            Probability::new(0.1).expect("valid probability"),
        ),
    }
}

pub fn analyzed_claim(id: &str) -> AnalyzedClaim {
    let messages: Vec<String> = THREE_LINE_SYNTHESIS.lines().map(String::from).collect();
    AnalyzedClaim {
        scored: scored_claim(id, "Lula signs decree"),
        subclaims: Vec::new(),
        news: vec![news_article("https://news/decreto", "Lula assina decreto")],
        analysis_message: messages.join("\n"),
        messages,
        risk: None,
    }
}

/// The record the download stage would have written.
pub fn record_for(id: &str) -> RequestRecord {
    downloaded_video(id).to_record()
}
