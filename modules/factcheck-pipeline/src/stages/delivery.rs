//! `message_delivery`: send the analysis lines to the user.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use factcheck_common::{DeliveredAnalysis, Envelope, FactCheckError, Payload, Stage};

use crate::stages::{unexpected_payload, StageRunner};
use crate::traits::MessageSender;

/// Platform limit for one direct message, in characters.
pub const MAX_MESSAGE_CHARS: usize = instagram::MAX_MESSAGE_CHARS;

/// Sent when the analysis carries neither lines nor a joined message.
pub const MISSING_RESULT_MESSAGE: &str =
    "A análise foi concluída, mas não foi possível recuperar o resultado.";

/// Split `text` into consecutive chunks of at most `limit` characters.
pub fn chunk_message(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Send `text` as as many messages as the length limit requires, in order.
/// Returns the number of messages sent.
pub async fn send_chunked(sender: &dyn MessageSender, user_id: &str, text: &str) -> Result<usize> {
    let chunks = chunk_message(text, MAX_MESSAGE_CHARS);
    for chunk in &chunks {
        sender.send(user_id, chunk).await?;
    }
    debug!(user_id, chunks = chunks.len(), "Message sent");
    Ok(chunks.len())
}

pub struct DeliveryStage {
    sender: Arc<dyn MessageSender>,
}

impl DeliveryStage {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl StageRunner for DeliveryStage {
    fn stage(&self) -> Stage {
        Stage::MessageDelivery
    }

    async fn run(&self, envelope: Envelope) -> Result<Payload, FactCheckError> {
        let analysis = match envelope.data {
            Payload::Analyzed(analysis) => analysis,
            other => return Err(unexpected_payload(self.stage(), &other)),
        };
        let user_id = analysis.request().user_id.clone();
        if user_id.trim().is_empty() {
            return Err(FactCheckError::Validation("userId is required".into()));
        }

        let lines: Vec<&str> = if !analysis.messages.is_empty() {
            analysis.messages.iter().map(String::as_str).collect()
        } else if !analysis.analysis_message.trim().is_empty() {
            vec![analysis.analysis_message.as_str()]
        } else {
            vec![MISSING_RESULT_MESSAGE]
        };

        let mut chunks_sent = 0;
        for line in lines {
            chunks_sent += send_chunked(self.sender.as_ref(), &user_id, line)
                .await
                .map_err(|e| FactCheckError::Delivery(e.to_string()))?;
        }
        info!(request_id = %analysis.request().request_id, chunks = chunks_sent, "Analysis delivered");

        Ok(Payload::Delivered(DeliveredAnalysis {
            analysis,
            chunks_sent,
        }))
    }
}
