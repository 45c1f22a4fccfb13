//! `related_news`: after delivery, send up to two of the retrieved articles
//! the generator judges most related to the analysis.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use factcheck_common::{Envelope, FactCheckError, NewsArticle, Payload, Stage};

use crate::stages::delivery::send_chunked;
use crate::stages::{unexpected_payload, StageRunner};
use crate::traits::{MessageSender, TextGenerator};

const MAX_RELATED: usize = 2;
const SELECTION_TEMPERATURE: f32 = 0.2;

pub const INTRO_MESSAGE: &str = "Seguem notícias potencialmente relacionadas com o vídeo enviado:";

fn selection_prompt(messages: &[String], news: &[NewsArticle]) -> String {
    let listing: Vec<String> = news
        .iter()
        .enumerate()
        .map(|(i, a)| format!("News {}:\nTitle: {}\nDescription: {}", i + 1, a.title, a.description))
        .collect();

    format!(
        "You rate how related news articles are to an analysis that was sent to a user.\n\n\
         Analysis sent to the user:\n{}\n\n\
         News articles:\n{}\n\n\
         Select at most the {MAX_RELATED} articles most related to the analysis. \
         Answer ONLY with their numbers separated by commas (for example \"1, 3\"). \
         If none is related, answer only: NONE",
        messages.join(" "),
        listing.join("\n\n")
    )
}

/// 1-based indices from the model answer, validated against `len`, at most
/// two, first mention wins. `NONE` and unparsable parts select nothing.
pub fn parse_selection(raw: &str, len: usize) -> Vec<usize> {
    let answer = raw.trim();
    if answer.eq_ignore_ascii_case("none") || answer.eq_ignore_ascii_case("nenhuma") {
        return Vec::new();
    }

    let mut picked = Vec::new();
    for part in answer.split(',') {
        let Ok(n) = part.trim().trim_matches(|c: char| !c.is_ascii_digit()).parse::<usize>() else {
            continue;
        };
        if (1..=len).contains(&n) && !picked.contains(&(n - 1)) {
            picked.push(n - 1);
        }
        if picked.len() == MAX_RELATED {
            break;
        }
    }
    picked
}

pub fn format_article(article: &NewsArticle) -> String {
    let mut text = format!("📰 {}\nFonte: {}", article.title, article.source);
    if !article.url.is_empty() {
        text.push_str(&format!("\nLink: {}", article.url));
    }
    text
}

pub struct RelatedNewsStage {
    generator: Arc<dyn TextGenerator>,
    sender: Arc<dyn MessageSender>,
}

impl RelatedNewsStage {
    pub fn new(generator: Arc<dyn TextGenerator>, sender: Arc<dyn MessageSender>) -> Self {
        Self { generator, sender }
    }

    async fn select<'a>(&self, request_id: &str, messages: &[String], news: &'a [NewsArticle]) -> Vec<&'a NewsArticle> {
        if messages.is_empty() || news.is_empty() {
            return Vec::new();
        }
        let prompt = selection_prompt(messages, news);
        match self.generator.generate(&prompt, Some(SELECTION_TEMPERATURE)).await {
            Ok(raw) => parse_selection(&raw, news.len()).into_iter().map(|i| &news[i]).collect(),
            Err(e) => {
                warn!(request_id, error = %e, "Related news selection failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl StageRunner for RelatedNewsStage {
    fn stage(&self) -> Stage {
        Stage::RelatedNews
    }

    async fn run(&self, envelope: Envelope) -> Result<Payload, FactCheckError> {
        let delivered = match envelope.data {
            Payload::Delivered(delivered) => delivered,
            other => return Err(unexpected_payload(self.stage(), &other)),
        };
        let analysis = &delivered.analysis;
        let request_id = analysis.request().request_id.as_str();
        let user_id = analysis.request().user_id.as_str();

        let related = self.select(request_id, &analysis.messages, &analysis.news).await;
        if related.is_empty() {
            info!(request_id, "No related news to send");
            return Ok(Payload::RelatedNewsSent { count: 0 });
        }

        if let Err(e) = self.sender.send(user_id, INTRO_MESSAGE).await {
            warn!(request_id, error = %e, "Related news intro not sent");
        }
        for article in &related {
            send_chunked(self.sender.as_ref(), user_id, &format_article(article))
                .await
                .map_err(|e| FactCheckError::Delivery(e.to_string()))?;
        }

        info!(request_id, count = related.len(), "Related news sent");
        Ok(Payload::RelatedNewsSent { count: related.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use factcheck_common::Topic;

    #[test]
    fn selection_parsing_is_lenient() {
        assert_eq!(parse_selection("1, 3", 3), vec![0, 2]);
        assert_eq!(parse_selection("NONE", 3), Vec::<usize>::new());
        assert_eq!(parse_selection("Nenhuma", 3), Vec::<usize>::new());
        assert_eq!(parse_selection("9, 2", 3), vec![1]);
        assert_eq!(parse_selection("2, 2, 1, 3", 3), vec![1, 0]);
        assert_eq!(parse_selection("\"1\"", 3), vec![0]);
        assert_eq!(parse_selection("the first one", 3), Vec::<usize>::new());
    }

    fn envelope() -> Envelope {
        let mut analyzed = analyzed_claim("r1");
        analyzed.news = vec![
            news_article("https://news/a", "Lula assina decreto"),
            news_article("https://news/b", "Decreto reduz preços"),
            news_article("https://news/c", "Outro assunto"),
        ];
        Envelope::new(
            Topic::run(Stage::RelatedNews),
            "r1",
            Payload::Delivered(factcheck_common::DeliveredAnalysis {
                analysis: analyzed,
                chunks_sent: 3,
            }),
        )
    }

    #[tokio::test]
    async fn sends_intro_and_selected_articles() {
        let sender = Arc::new(RecordingSender::new());
        let stage = RelatedNewsStage::new(Arc::new(ScriptedGenerator::new().reply("2, 1")), sender.clone());

        let payload = stage.run(envelope()).await.unwrap();

        assert_eq!(payload, Payload::RelatedNewsSent { count: 2 });
        let texts = sender.texts();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], INTRO_MESSAGE);
        assert!(texts[1].contains("https://news/b"));
        assert!(texts[2].contains("https://news/a"));
    }

    #[tokio::test]
    async fn none_or_generator_failure_sends_nothing() {
        for generator in [ScriptedGenerator::new().reply("NONE"), ScriptedGenerator::new().fail("quota")] {
            let sender = Arc::new(RecordingSender::new());
            let stage = RelatedNewsStage::new(Arc::new(generator), sender.clone());

            let payload = stage.run(envelope()).await.unwrap();

            assert_eq!(payload, Payload::RelatedNewsSent { count: 0 });
            assert!(sender.texts().is_empty());
        }
    }

    #[test]
    fn article_format_includes_source_and_link() {
        let text = format_article(&news_article("https://news/a", "Lula assina decreto"));
        assert_eq!(text, "📰 Lula assina decreto\nFonte: GoogleNews\nLink: https://news/a");
    }
}
