use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::traits::{MediaRef, PromptBuilder};

use super::types::*;
use super::Gemini;

pub struct GeminiPromptBuilder {
    agent: Gemini,
    input: String,
    preamble: Option<String>,
    temperature: Option<f32>,
    media: Vec<MediaRef>,
}

impl GeminiPromptBuilder {
    pub(crate) fn new(agent: Gemini, input: String) -> Self {
        Self {
            agent,
            input,
            preamble: None,
            temperature: None,
            media: Vec::new(),
        }
    }

    fn build_request(&self) -> GenerateRequest {
        let mut parts: Vec<Part> = self
            .media
            .iter()
            .map(|m| Part::file(&m.mime_type, &m.uri))
            .collect();
        if !self.input.is_empty() {
            parts.push(Part::text(&self.input));
        }

        let contents = if parts.is_empty() {
            Vec::new()
        } else {
            vec![Content::user(parts)]
        };
        let mut request = GenerateRequest::new(contents);
        if let Some(preamble) = self.preamble.as_ref().filter(|p| !p.is_empty()) {
            request = request.system(preamble.clone());
        }
        if let Some(temp) = self.temperature {
            request = request.temperature(temp);
        }
        request
    }
}

#[async_trait]
impl PromptBuilder for GeminiPromptBuilder {
    fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn attach(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }

    /// Returns an empty string when the model produced no text (safety block,
    /// max tokens before any output). Callers decide whether that is an error.
    async fn send(self) -> Result<String> {
        let request = self.build_request();
        let response = self
            .agent
            .client()
            .generate(&self.agent.model, &request)
            .await?;

        match response.text() {
            Some(text) => Ok(text),
            None => {
                debug!(
                    finish_reason = response.finish_reason().unwrap_or("unknown"),
                    media = self.media.len(),
                    "Gemini returned no text"
                );
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Agent, PromptBuilder};

    #[test]
    fn media_parts_precede_the_prompt_text() {
        let request = Gemini::new("key", "gemini-2.5-flash")
            .prompt("State the main claim of the video.")
            .attach(MediaRef::new("https://files/abc", "video/mp4"))
            .preamble("You are a fact-checker.")
            .temperature(0.2)
            .build_request();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You are a fact-checker.");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["fileData"]["fileUri"], "https://files/abc");
        assert_eq!(json["contents"][0]["parts"][0]["fileData"]["mimeType"], "video/mp4");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "State the main claim of the video.");
        assert_eq!(json["generationConfig"]["temperature"], 0.2f32 as f64);
    }

    #[test]
    fn empty_input_sends_no_turn() {
        let request = Gemini::new("key", "m").prompt("").preamble("").build_request();
        assert!(request.contents.is_empty());
        assert!(request.system_instruction.is_none());
        assert!(request.generation_config.is_none());
    }
}
