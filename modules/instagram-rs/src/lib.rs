//! Instagram Graph API messaging: send direct-message text to a user id.

pub mod models;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{GraphErrorEnvelope, SendMessageRequest, SendMessageResponse};

const GRAPH_URL: &str = "https://graph.instagram.com/v21.0";

/// Graph API rejects DM text longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum InstagramError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Graph API error (status {status}, code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for InstagramError {
    fn from(err: reqwest::Error) -> Self {
        InstagramError::Network(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct InstagramOptions {
    pub access_token: String,
    pub graph_url: String,
}

impl InstagramOptions {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            graph_url: GRAPH_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstagramService {
    options: InstagramOptions,
    client: Client,
}

impl InstagramService {
    pub fn new(options: InstagramOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    /// Send one text message. The caller is responsible for chunking text
    /// to `MAX_MESSAGE_CHARS`.
    pub async fn send_text(
        &self,
        recipient_id: &str,
        text: &str,
    ) -> Result<SendMessageResponse, InstagramError> {
        if recipient_id.trim().is_empty() {
            return Err(InstagramError::InvalidRecipient(
                "recipient id is empty".to_string(),
            ));
        }

        let url = format!("{}/me/messages", self.options.graph_url);
        let payload = SendMessageRequest::text(recipient_id, text);

        let res = self
            .client
            .post(url)
            .bearer_auth(&self.options.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Instagram send failed");
            return Err(parse_error(status.as_u16(), &body));
        }

        let response: SendMessageResponse =
            serde_json::from_str(&body).map_err(|e| InstagramError::Parse(e.to_string()))?;
        debug!(message_id = ?response.message_id, "Instagram message sent");
        Ok(response)
    }
}

fn parse_error(status: u16, body: &str) -> InstagramError {
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(envelope) => InstagramError::Api {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => InstagramError::Api {
            status,
            code: None,
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_shape_matches_graph_api() {
        let payload = SendMessageRequest::text("1784", "Risk: Low");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["recipient"]["id"], "1784");
        assert_eq!(json["message"]["text"], "Risk: Low");
    }

    #[test]
    fn graph_error_envelope_is_unpacked() {
        let body = r#"{"error": {"message": "Invalid OAuth access token", "type": "OAuthException", "code": 190}}"#;
        match parse_error(400, body) {
            InstagramError::Api { status, code, message } => {
                assert_eq!(status, 400);
                assert_eq!(code, Some(190));
                assert_eq!(message, "Invalid OAuth access token");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_is_kept_verbatim() {
        match parse_error(503, "unavailable") {
            InstagramError::Api { code, message, .. } => {
                assert_eq!(code, None);
                assert_eq!(message, "unavailable");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_recipient_is_rejected_before_any_request() {
        let service = InstagramService::new(InstagramOptions::new("token"));
        let err = service.send_text("  ", "hi").await.unwrap_err();
        assert!(matches!(err, InstagramError::InvalidRecipient(_)));
    }
}
