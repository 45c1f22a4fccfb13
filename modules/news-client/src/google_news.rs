//! Google News search through its public RSS endpoint.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{NewsError, Result};
use crate::types::{Article, SearchOptions};

const BASE_URL: &str = "https://news.google.com/rss/search";

pub struct GoogleNewsClient {
    client: reqwest::Client,
    options: SearchOptions,
    base_url: String,
}

impl GoogleNewsClient {
    pub fn new(options: SearchOptions) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build Google News HTTP client");
        Self {
            client,
            options,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Search query including the recency operator Google News understands.
    fn query_string(&self, query: &str) -> String {
        match self.options.recency_days {
            Some(days) => format!("{query} when:{days}d"),
            None => query.to_string(),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Article>> {
        let q = self.query_string(query);
        let ceid = format!("{}:{}", self.options.country, self.options.language);

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", q.as_str()),
                ("hl", self.options.language.as_str()),
                ("gl", self.options.country.as_str()),
                ("ceid", ceid.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NewsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = resp.bytes().await?;
        let articles = parse_feed(&bytes, self.options.max_results)?;
        info!(query, count = articles.len(), "Google News search complete");
        Ok(articles)
    }
}

/// Parse an RSS payload into articles, keeping feed order.
pub(crate) fn parse_feed(bytes: &[u8], max_results: usize) -> Result<Vec<Article>> {
    let feed = feed_rs::parser::parse(bytes)?;

    let articles: Vec<Article> = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

            let description = entry
                .summary
                .map(|s| strip_html(&s.content))
                .unwrap_or_default();

            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let publisher = publisher_from_title(&title);

            Some(Article {
                title,
                description,
                url,
                publisher,
                published_at: entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&chrono::Utc)),
            })
        })
        .take(max_results)
        .collect();

    debug!(count = articles.len(), "Parsed Google News feed");
    Ok(articles)
}

/// Google News titles end in " - Publisher".
fn publisher_from_title(title: &str) -> Option<String> {
    let (_, publisher) = title.rsplit_once(" - ")?;
    let publisher = publisher.trim();
    (!publisher.is_empty()).then(|| publisher.to_string())
}

/// Google News descriptions are HTML fragments (a link plus the publisher).
fn strip_html(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid HTML tag regex"));
    let text = tag.replace_all(html, " ");
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"decreto alimentos" - Google Notícias</title>
    <link>https://news.google.com</link>
    <description>Google Notícias</description>
    <item>
      <title>Lula assina decreto que reduz preço dos alimentos - Folha</title>
      <link>https://news.google.com/articles/abc</link>
      <pubDate>Mon, 01 Sep 2025 12:00:00 GMT</pubDate>
      <description>&lt;a href="https://folha.com/x"&gt;Lula assina decreto&lt;/a&gt;&amp;nbsp;&amp;nbsp;&lt;font color="#6f6f6f"&gt;Folha&lt;/font&gt;</description>
    </item>
    <item>
      <title>Governo anuncia medidas</title>
      <link>https://news.google.com/articles/def</link>
    </item>
  </channel>
</rss>"##;

    #[test]
    fn parses_items_and_strips_description_markup() {
        let articles = parse_feed(FEED.as_bytes(), 20).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].url, "https://news.google.com/articles/abc");
        assert_eq!(articles[0].description, "Lula assina decreto Folha");
        assert!(articles[0].published_at.is_some());
        assert_eq!(articles[0].publisher.as_deref(), Some("Folha"));
        assert_eq!(articles[1].description, "");
        assert_eq!(articles[1].publisher, None);
    }

    #[test]
    fn max_results_truncates_in_feed_order() {
        let articles = parse_feed(FEED.as_bytes(), 1).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Lula assina decreto que reduz preço dos alimentos - Folha");
    }

    #[test]
    fn recency_is_expressed_as_query_operator() {
        let client = GoogleNewsClient::new(SearchOptions {
            recency_days: Some(7),
            ..SearchOptions::default()
        });
        assert_eq!(client.query_string("decreto"), "decreto when:7d");
    }

    #[test]
    fn garbage_payload_is_a_parse_error() {
        assert!(matches!(parse_feed(b"not xml", 5), Err(NewsError::Parse(_))));
    }
}
