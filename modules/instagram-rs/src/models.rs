use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub recipient: Recipient,
    pub message: OutgoingMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub text: String,
}

impl SendMessageRequest {
    pub fn text(recipient_id: &str, text: &str) -> Self {
        Self {
            recipient: Recipient {
                id: recipient_id.to_string(),
            },
            message: OutgoingMessage {
                text: text.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    pub recipient_id: Option<String>,
    pub message_id: Option<String>,
}

/// Graph API error envelope: `{"error": {"message", "type", "code"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<i64>,
}
