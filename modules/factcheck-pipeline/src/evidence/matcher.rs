//! Multi-source evidence retrieval with sentence-level relevance scoring.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use factcheck_common::NewsArticle;

use crate::evidence::similarity::article_score;
use crate::evidence::stopwords::PORTUGUESE;
use crate::traits::EvidenceSource;

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Maximum number of articles returned by one `run`.
    pub top_n: usize,
    /// Articles scoring below this are discarded.
    pub similarity_threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            top_n: 2,
            similarity_threshold: 0.001,
        }
    }
}

pub struct EvidenceMatcher {
    sources: Vec<Arc<dyn EvidenceSource>>,
    config: MatcherConfig,
    stopwords: HashSet<&'static str>,
}

impl EvidenceMatcher {
    pub fn new(sources: Vec<Arc<dyn EvidenceSource>>, config: MatcherConfig) -> Self {
        Self {
            sources,
            config,
            stopwords: PORTUGUESE.iter().copied().collect(),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Query every source with every query and return the best `top_n`
    /// articles, url-unique, sorted by score descending.
    ///
    /// Sources are best-effort: a failing source contributes nothing.
    pub async fn run(&self, queries: &[String]) -> Vec<NewsArticle> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut matched: Vec<NewsArticle> = Vec::new();

        for query in queries.iter().map(|q| q.trim()).filter(|q| !q.is_empty()) {
            for source in &self.sources {
                let candidates = match source.search(query).await {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(source = source.name(), query, error = %e, "Evidence source failed");
                        continue;
                    }
                };
                debug!(source = source.name(), query, candidates = candidates.len(), "Evidence candidates");

                for article in candidates {
                    let score = article_score(query, &article.title, &article.description, &self.stopwords);
                    if score < self.config.similarity_threshold {
                        continue;
                    }
                    // First occurrence wins; queries and sources run in a fixed order.
                    if !seen.insert(article.url.clone()) {
                        continue;
                    }
                    matched.push(NewsArticle {
                        source: article
                            .publisher
                            .filter(|p| !p.is_empty())
                            .unwrap_or_else(|| source.name().to_string()),
                        title: article.title,
                        description: article.description,
                        url: article.url,
                        score,
                        query: query.to_string(),
                    });
                }
            }
        }

        matched.sort_by(|a, b| b.score.total_cmp(&a.score));
        matched.truncate(self.config.top_n);

        info!(
            queries = queries.len(),
            matched = matched.len(),
            top_score = matched.first().map(|a| a.score).unwrap_or(0.0),
            "Evidence matched"
        );
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{article, MockEvidenceSource};

    fn matcher(sources: Vec<Arc<dyn EvidenceSource>>, top_n: usize, threshold: f64) -> EvidenceMatcher {
        EvidenceMatcher::new(
            sources,
            MatcherConfig {
                top_n,
                similarity_threshold: threshold,
            },
        )
    }

    #[tokio::test]
    async fn overlapping_urls_across_queries_appear_once() {
        let shared = article("https://news/decreto", "Lula assina decreto de alimentos", "");
        let source = MockEvidenceSource::new("GoogleNews")
            .on_query("lula decreto", vec![shared.clone()])
            .on_query("decreto alimentos", vec![
                shared,
                article("https://news/precos", "Decreto reduz preço dos alimentos", ""),
            ]);

        let m = matcher(vec![Arc::new(source)], 10, 0.001);
        let results = m
            .run(&["lula decreto".to_string(), "decreto alimentos".to_string()])
            .await;

        let urls: Vec<&str> = results.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls.iter().filter(|u| **u == "https://news/decreto").count(), 1);
        assert_eq!(results.len(), 2);
        // First occurrence wins: it came from the first query.
        let kept = results.iter().find(|a| a.url == "https://news/decreto").unwrap();
        assert_eq!(kept.query, "lula decreto");
    }

    #[tokio::test]
    async fn below_threshold_never_returned() {
        let source = MockEvidenceSource::new("NewsAPI").on_query(
            "lula decreto",
            vec![
                article("https://news/a", "Lula assina decreto", ""),
                article("https://news/b", "Chuva forte no litoral paulista", ""),
            ],
        );
        let m = matcher(vec![Arc::new(source)], 10, 0.3);

        let results = m.run(&["lula decreto".to_string()]).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://news/a");
        assert!(results.iter().all(|a| a.score >= 0.3));
    }

    #[tokio::test]
    async fn results_sorted_and_capped_at_top_n() {
        let source = MockEvidenceSource::new("GoogleNews").on_query(
            "lula assina decreto alimentos",
            vec![
                article("https://news/weak", "Lula viaja para Brasília", ""),
                article("https://news/strong", "Lula assina decreto alimentos", ""),
                article("https://news/mid", "Lula assina acordo comercial", ""),
            ],
        );
        let m = matcher(vec![Arc::new(source)], 2, 0.001);

        let results = m.run(&["lula assina decreto alimentos".to_string()]).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://news/strong");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn failing_source_does_not_hide_other_sources() {
        let broken = MockEvidenceSource::new("GoogleNews").failing();
        let working = MockEvidenceSource::new("NewsAPI").on_query(
            "lula decreto",
            vec![article("https://news/a", "Lula assina decreto", "")],
        );
        let m = matcher(vec![Arc::new(broken), Arc::new(working)], 2, 0.001);

        let results = m.run(&["lula decreto".to_string()]).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "NewsAPI");
    }

    #[tokio::test]
    async fn no_candidates_is_an_empty_result() {
        let m = matcher(vec![Arc::new(MockEvidenceSource::new("GoogleNews"))], 2, 0.001);
        assert!(m.run(&["anything".to_string()]).await.is_empty());
        assert!(m.run(&[]).await.is_empty());
    }
}
