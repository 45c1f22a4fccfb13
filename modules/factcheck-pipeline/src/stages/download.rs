//! `reels_download`: fetch the video to local disk and create the record.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::info;

use factcheck_common::{DownloadedVideo, Envelope, FactCheckError, Payload, Stage};

use crate::stages::{unexpected_payload, StageRunner};
use crate::traits::{MediaDownloader, MediaHandle, RecordStore};

// ---------------------------------------------------------------------------
// HttpMediaDownloader
// ---------------------------------------------------------------------------

/// Streams a URL to `<dir>/<request_id>.mp4`.
pub struct HttpMediaDownloader {
    client: reqwest::Client,
    dir: PathBuf,
}

impl HttpMediaDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build media download HTTP client");
        Self {
            client,
            dir: dir.into(),
        }
    }

    pub fn path_for(&self, request_id: &str) -> PathBuf {
        self.dir.join(format!("{request_id}.mp4"))
    }
}

#[async_trait]
impl MediaDownloader for HttpMediaDownloader {
    async fn download(&self, request_id: &str, url: &str) -> Result<MediaHandle> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let response = self.client.get(url).send().await?.error_for_status()?;
        let path = self.path_for(request_id);
        let bytes_written = write_stream(&path, response.bytes_stream()).await?;

        info!(request_id, path = %path.display(), bytes = bytes_written, "Media downloaded");
        Ok(MediaHandle::new(path))
    }
}

/// Write every chunk of `stream` to `path`. A failed transfer leaves no file behind.
async fn write_stream<S, B, E>(path: &Path, stream: S) -> Result<usize>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<anyhow::Error>,
{
    let mut stream = std::pin::pin!(stream);
    let written: Result<usize> = async {
        let mut file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("creating {}", path.display()))?;
        let mut total = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return Err(e.into()),
            };
            file.write_all(chunk.as_ref()).await?;
            total += chunk.as_ref().len();
        }
        file.flush().await?;
        Ok(total)
    }
    .await;

    if written.is_err() {
        let _ = tokio::fs::remove_file(path).await;
    }
    written
}

// ---------------------------------------------------------------------------
// DownloadStage
// ---------------------------------------------------------------------------

pub struct DownloadStage {
    downloader: Arc<dyn MediaDownloader>,
    store: Arc<dyn RecordStore>,
}

impl DownloadStage {
    pub fn new(downloader: Arc<dyn MediaDownloader>, store: Arc<dyn RecordStore>) -> Self {
        Self { downloader, store }
    }
}

#[async_trait]
impl StageRunner for DownloadStage {
    fn stage(&self) -> Stage {
        Stage::ReelsDownload
    }

    async fn run(&self, envelope: Envelope) -> Result<Payload, FactCheckError> {
        let request = match envelope.data {
            Payload::Inbound(request) => request,
            other => return Err(unexpected_payload(self.stage(), &other)),
        };
        if request.video_url.trim().is_empty() {
            return Err(FactCheckError::Validation("videoUrl is required".into()));
        }

        let media = self
            .downloader
            .download(&request.request_id, &request.video_url)
            .await
            .map_err(|e| FactCheckError::Download(e.to_string()))?;

        let downloaded = DownloadedVideo {
            request,
            video_path: media.path().display().to_string(),
        };
        self.store
            .write(&downloaded.request.request_id, &downloaded.to_record())
            .await
            .map_err(|e| FactCheckError::Persistence(e.to_string()))?;

        Ok(Payload::Downloaded(downloaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use factcheck_common::Topic;

    #[tokio::test]
    async fn download_writes_initial_record() {
        let store = Arc::new(MemoryRecordStore::new());
        let stage = DownloadStage::new(Arc::new(StubDownloader::new("/tmp/media")), store.clone());

        let payload = stage
            .run(Envelope::new(Topic::run(Stage::ReelsDownload), "r1", Payload::Inbound(inbound_request("r1"))))
            .await
            .unwrap();

        let Payload::Downloaded(video) = payload else {
            panic!("expected downloaded payload");
        };
        assert_eq!(video.video_path, "/tmp/media/r1.mp4");
        let record = store.get("r1").await.unwrap().unwrap();
        assert_eq!(record.video_path, "/tmp/media/r1.mp4");
        assert!(record.claim.is_empty());
    }

    #[tokio::test]
    async fn missing_url_is_validation_error_before_download() {
        let downloader = Arc::new(StubDownloader::new("/tmp/media"));
        let stage = DownloadStage::new(downloader.clone(), Arc::new(MemoryRecordStore::new()));
        let mut request = inbound_request("r1");
        request.video_url.clear();

        let err = stage
            .run(Envelope::new(Topic::run(Stage::ReelsDownload), "r1", Payload::Inbound(request)))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(downloader.calls(), 0);
    }

    #[tokio::test]
    async fn downloader_failure_is_download_error() {
        let stage = DownloadStage::new(
            Arc::new(StubDownloader::new("/tmp/media").failing()),
            Arc::new(MemoryRecordStore::new()),
        );
        let err = stage
            .run(Envelope::new(Topic::run(Stage::ReelsDownload), "r1", Payload::Inbound(inbound_request("r1"))))
            .await
            .unwrap_err();
        assert!(matches!(err, FactCheckError::Download(_)));
    }

    #[tokio::test]
    async fn http_downloader_names_file_after_request() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = HttpMediaDownloader::new(dir.path());
        assert_eq!(downloader.path_for("abc"), dir.path().join("abc.mp4"));
    }

    #[tokio::test]
    async fn interrupted_transfer_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.mp4");
        let chunks = futures::stream::iter(vec![
            Ok(vec![0u8; 16]),
            Err(std::io::Error::other("connection reset")),
        ]);

        let err = write_stream(&path, chunks).await.unwrap_err();

        assert!(err.to_string().contains("connection reset"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn complete_transfer_keeps_every_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.mp4");
        let chunks = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(vec![1u8; 10]),
            Ok(vec![2u8; 6]),
        ]);

        assert_eq!(write_stream(&path, chunks).await.unwrap(), 16);
        assert_eq!(std::fs::read(&path).unwrap().len(), 16);
    }
}
