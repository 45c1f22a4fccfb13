use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, info};

use super::types::*;
use crate::error::AiError;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_UPLOAD_URL: &str = "https://generativelanguage.googleapis.com/upload/v1beta/files";

pub(crate) struct GeminiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    upload_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: GEMINI_API_URL.to_string(),
            upload_url: GEMINI_UPLOAD_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap, AiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key).map_err(|e| AiError::Config(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, AiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        debug!(model, contents = request.contents.len(), "Gemini generate request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Resumable upload in two requests: start (returns an upload URL in a
    /// response header) then upload+finalize with the raw bytes.
    pub async fn upload(
        &self,
        display_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<FileResource, AiError> {
        let mut start_headers = self.headers()?;
        start_headers.insert("X-Goog-Upload-Protocol", HeaderValue::from_static("resumable"));
        start_headers.insert("X-Goog-Upload-Command", HeaderValue::from_static("start"));
        start_headers.insert(
            "X-Goog-Upload-Header-Content-Length",
            HeaderValue::from(bytes.len() as u64),
        );
        start_headers.insert(
            "X-Goog-Upload-Header-Content-Type",
            HeaderValue::from_str(mime_type).map_err(|e| AiError::Config(e.to_string()))?,
        );

        let start = self
            .http
            .post(&self.upload_url)
            .headers(start_headers)
            .json(&StartUpload {
                file: StartUploadFile {
                    display_name: display_name.to_string(),
                },
            })
            .send()
            .await?;

        let status = start.status();
        if !status.is_success() {
            let message = start.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AiError::Parse("upload start returned no x-goog-upload-url".into()))?;

        let mut upload_headers = HeaderMap::new();
        upload_headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len() as u64));
        upload_headers.insert("X-Goog-Upload-Offset", HeaderValue::from_static("0"));
        upload_headers.insert(
            "X-Goog-Upload-Command",
            HeaderValue::from_static("upload, finalize"),
        );

        let response = self
            .http
            .post(&session_url)
            .headers(upload_headers)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response.json().await?;
        info!(name = %uploaded.file.name, "Uploaded file to Gemini");
        Ok(uploaded.file)
    }

    pub async fn get_file(&self, name: &str) -> Result<FileResource, AiError> {
        let url = format!("{}/{}", self.base_url, name);
        let response = self.http.get(&url).headers(self.headers()?).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Poll until the file leaves the PROCESSING state.
    pub async fn wait_until_active(
        &self,
        mut file: FileResource,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<FileResource, AiError> {
        let started = Instant::now();
        while file.state == FileState::Processing {
            if started.elapsed() > timeout {
                return Err(AiError::Timeout(timeout.as_secs()));
            }
            debug!(name = %file.name, "File still processing");
            tokio::time::sleep(poll_interval).await;
            file = self.get_file(&file.name).await?;
        }

        if file.state == FileState::Failed {
            return Err(AiError::FileProcessing(format!(
                "{} failed server-side processing",
                file.name
            )));
        }

        Ok(file)
    }
}
