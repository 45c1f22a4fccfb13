//! NewsAPI `/v2/everything` search.

use chrono::Utc;
use tracing::info;

use crate::error::{NewsError, Result};
use crate::types::{Article, NewsApiResponse, SearchOptions};

const BASE_URL: &str = "https://newsapi.org/v2";

pub struct NewsApiClient {
    client: reqwest::Client,
    api_key: String,
    options: SearchOptions,
    base_url: String,
}

impl NewsApiClient {
    pub fn new(api_key: String, options: SearchOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            options,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn query_params(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("language", self.options.language.clone()),
            ("pageSize", self.options.max_results.to_string()),
            ("sortBy", "relevancy".to_string()),
        ];
        if let Some(days) = self.options.recency_days {
            let from = Utc::now() - chrono::Duration::days(i64::from(days));
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        params
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Article>> {
        let url = format!("{}/everything", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&self.query_params(query))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let parsed = parse_response(status.as_u16(), &body)?;

        info!(query, count = parsed.len(), "NewsAPI search complete");
        Ok(parsed)
    }
}

/// NewsAPI reports errors both through HTTP status and `status: "error"`.
pub(crate) fn parse_response(status: u16, body: &str) -> Result<Vec<Article>> {
    let parsed: NewsApiResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(_) if !(200..300).contains(&status) => {
            return Err(NewsError::Api {
                status,
                message: body.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    if parsed.status != "ok" || !(200..300).contains(&status) {
        return Err(NewsError::Api {
            status,
            message: format!(
                "{}: {}",
                parsed.code.unwrap_or_default(),
                parsed.message.unwrap_or_default()
            ),
        });
    }

    Ok(parsed
        .articles
        .into_iter()
        .filter_map(|a| a.into_article())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_articles_and_drops_missing_urls() {
        let body = r#"{
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {"source": {"id": null, "name": "G1"}, "title": "Decreto publicado",
                 "description": "O presidente assinou.", "url": "https://g1.globo.com/a",
                 "publishedAt": "2025-09-01T10:00:00Z"},
                {"source": {"id": null, "name": "X"}, "title": "Sem link", "description": null, "url": null}
            ]
        }"#;
        let articles = parse_response(200, body).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].publisher.as_deref(), Some("G1"));
        assert_eq!(articles[0].description, "O presidente assinou.");
    }

    #[test]
    fn error_status_in_body_is_api_error() {
        let body = r#"{"status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid."}"#;
        match parse_response(401, body) {
            Err(NewsError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("apiKeyInvalid"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_keeps_status() {
        assert!(matches!(
            parse_response(502, "Bad Gateway"),
            Err(NewsError::Api { status: 502, .. })
        ));
    }

    #[test]
    fn recency_adds_from_param() {
        let client = NewsApiClient::new(
            "k".into(),
            SearchOptions {
                recency_days: Some(30),
                ..SearchOptions::default()
            },
        );
        let params = client.query_params("decreto");
        assert!(params.iter().any(|(k, _)| *k == "from"));
        assert!(params.contains(&("pageSize", "20".to_string())));
    }
}
