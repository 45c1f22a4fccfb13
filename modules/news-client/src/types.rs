use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A provider-agnostic search hit. Both clients convert their native
/// payloads into this.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
    pub publisher: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Shared search settings for a provider.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// ISO 639-1 language code, e.g. "pt".
    pub language: String,
    /// ISO 3166-1 alpha-2 country code, e.g. "BR". Only Google News uses it.
    pub country: String,
    pub max_results: usize,
    /// Only return articles published within this many days.
    pub recency_days: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            language: "pt".to_string(),
            country: "BR".to_string(),
            max_results: 20,
            recency_days: None,
        }
    }
}

// --- NewsAPI wire types ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewsApiResponse {
    pub status: String,
    #[serde(default)]
    pub articles: Vec<NewsApiArticle>,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewsApiArticle {
    pub source: Option<NewsApiSource>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NewsApiSource {
    pub name: Option<String>,
}

impl NewsApiArticle {
    /// Articles without a URL cannot be deduplicated or linked, drop them.
    pub fn into_article(self) -> Option<Article> {
        let url = self.url.filter(|u| !u.is_empty())?;
        Some(Article {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            url,
            publisher: self.source.and_then(|s| s.name),
            published_at: self.published_at,
        })
    }
}
