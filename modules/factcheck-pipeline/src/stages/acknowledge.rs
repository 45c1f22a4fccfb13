//! `processing_message`: tell the user their video is being analysed.

use std::sync::Arc;

use async_trait::async_trait;

use factcheck_common::{Envelope, FactCheckError, Payload, Stage};

use crate::stages::delivery::send_chunked;
use crate::stages::{unexpected_payload, StageRunner};
use crate::traits::MessageSender;

pub const PROCESSING_MESSAGE: &str =
    "Estamos processando seu vídeo, a análise será finalizada em alguns instantes!";

pub struct AcknowledgeStage {
    sender: Arc<dyn MessageSender>,
}

impl AcknowledgeStage {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl StageRunner for AcknowledgeStage {
    fn stage(&self) -> Stage {
        Stage::ProcessingMessage
    }

    async fn run(&self, envelope: Envelope) -> Result<Payload, FactCheckError> {
        let request = match envelope.data {
            Payload::Inbound(request) => request,
            other => return Err(unexpected_payload(self.stage(), &other)),
        };
        send_chunked(self.sender.as_ref(), &request.user_id, PROCESSING_MESSAGE)
            .await
            .map_err(|e| FactCheckError::Delivery(e.to_string()))?;
        Ok(Payload::Acknowledged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use factcheck_common::Topic;

    #[tokio::test]
    async fn acknowledgement_goes_to_the_requesting_user() {
        let sender = Arc::new(RecordingSender::new());
        let stage = AcknowledgeStage::new(sender.clone());

        let payload = stage
            .run(Envelope::new(Topic::run(Stage::ProcessingMessage), "r1", Payload::Inbound(inbound_request("r1"))))
            .await
            .unwrap();

        assert_eq!(payload, Payload::Acknowledged);
        assert_eq!(sender.sent(), vec![("u1".to_string(), PROCESSING_MESSAGE.to_string())]);
    }
}
