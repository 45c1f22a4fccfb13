use std::env;
use std::str::FromStr;

use tracing::info;

use crate::error::FactCheckError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub gemini_api_key: String,
    pub gemini_model: String,

    // Evidence sources
    pub newsapi_key: String,
    pub news_language: String,
    pub news_country: String,
    pub news_max_results: usize,
    pub news_recency_days: Option<u32>,

    // Messaging
    pub instagram_access_token: String,

    // Storage
    pub database_url: Option<String>,
    pub media_dir: String,

    // Manipulation scoring service
    pub scorer_url: String,

    // Verification
    pub evidence_top_n: usize,
    pub similarity_threshold: f64,
    pub subclaim_count: usize,
    pub response_language: String,
    pub related_news: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, FactCheckError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` is this over the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FactCheckError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                FactCheckError::Config(format!("{key} environment variable is required"))
            })
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: or("GEMINI_MODEL", "gemini-2.5-flash"),
            newsapi_key: required("NEWSAPI_KEY")?,
            news_language: or("NEWS_LANGUAGE", "pt"),
            news_country: or("NEWS_COUNTRY", "BR"),
            news_max_results: parsed(get("NEWS_MAX_RESULTS"), "NEWS_MAX_RESULTS", 20)?,
            news_recency_days: get("NEWS_RECENCY_DAYS")
                .map(|v| parse_value(&v, "NEWS_RECENCY_DAYS"))
                .transpose()?,
            instagram_access_token: required("INSTAGRAM_ACCESS_TOKEN")?,
            database_url: get("DATABASE_URL"),
            media_dir: or("MEDIA_DIR", "data/requests"),
            scorer_url: or("SCORER_URL", "http://127.0.0.1:8000"),
            evidence_top_n: parsed(get("EVIDENCE_TOP_N"), "EVIDENCE_TOP_N", 2)?,
            similarity_threshold: parsed(get("SIMILARITY_THRESHOLD"), "SIMILARITY_THRESHOLD", 0.001)?,
            subclaim_count: parsed(get("SUBCLAIM_COUNT"), "SUBCLAIM_COUNT", 2)?,
            response_language: or("RESPONSE_LANGUAGE", "Brazilian Portuguese"),
            related_news: parsed(get("RELATED_NEWS"), "RELATED_NEWS", true)?,
        })
    }

    /// Log the effective configuration with secrets reduced to set/missing.
    pub fn log_redacted(&self) {
        let presence = |s: &str| if s.is_empty() { "missing" } else { "set" };
        info!(
            gemini_api_key = presence(&self.gemini_api_key),
            gemini_model = %self.gemini_model,
            newsapi_key = presence(&self.newsapi_key),
            instagram_access_token = presence(&self.instagram_access_token),
            database = if self.database_url.is_some() { "postgres" } else { "memory" },
            media_dir = %self.media_dir,
            scorer_url = %self.scorer_url,
            news_language = %self.news_language,
            news_country = %self.news_country,
            news_max_results = self.news_max_results,
            evidence_top_n = self.evidence_top_n,
            similarity_threshold = self.similarity_threshold,
            subclaim_count = self.subclaim_count,
            related_news = self.related_news,
            "Configuration loaded"
        );
    }
}

fn parse_value<T: FromStr>(raw: &str, key: &str) -> Result<T, FactCheckError> {
    raw.trim()
        .parse()
        .map_err(|_| FactCheckError::Config(format!("{key} has an invalid value: {raw}")))
}

fn parsed<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, FactCheckError> {
    match raw {
        Some(v) => parse_value(&v, key),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("GEMINI_API_KEY", "g"),
        ("NEWSAPI_KEY", "n"),
        ("INSTAGRAM_ACCESS_TOKEN", "i"),
    ];

    #[test]
    fn defaults_apply_when_only_required_keys_set() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.media_dir, "data/requests");
        assert_eq!(config.news_max_results, 20);
        assert_eq!(config.news_recency_days, None);
        assert_eq!(config.evidence_top_n, 2);
        assert_eq!(config.subclaim_count, 2);
        assert!(config.related_news);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn missing_required_key_is_config_error() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, FactCheckError::Config(msg) if msg.contains("INSTAGRAM_ACCESS_TOKEN")));
    }

    #[test]
    fn invalid_number_is_config_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("EVIDENCE_TOP_N", "two"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, FactCheckError::Config(msg) if msg.contains("EVIDENCE_TOP_N")));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("NEWS_RECENCY_DAYS", "7"),
            ("RELATED_NEWS", "false"),
            ("SIMILARITY_THRESHOLD", "0.05"),
            ("DATABASE_URL", "postgres://localhost/factcheck"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.news_recency_days, Some(7));
        assert!(!config.related_news);
        assert_eq!(config.similarity_threshold, 0.05);
        assert!(config.database_url.is_some());
    }
}
