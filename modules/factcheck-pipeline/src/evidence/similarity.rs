//! Sentence-level TF-IDF cosine similarity.
//!
//! Terms are word unigrams and bigrams over `\w\w+` tokens with stopwords
//! removed first. IDF is smoothed (`ln((1 + n) / (1 + df)) + 1`), term
//! frequencies are raw counts and vectors are L2-normalised, so cosine
//! similarity is a plain dot product.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fragments this short (in chars) are not treated as sentences.
const MIN_SENTENCE_CHARS: usize = 10;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid token regex"))
}

fn sentence_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"))
}

/// Lowercase and strip diacritics: "Decisão" → "decisao".
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Split on `.`, `!` or `?` followed by whitespace, dropping short fragments.
pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_break_re()
        .split(text.trim())
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

/// Unigram and bigram terms of `text` after stopword removal.
pub fn terms(text: &str, stopwords: &HashSet<&str>) -> Vec<String> {
    let tokens: Vec<&str> = token_re()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|t| !stopwords.contains(t))
        .collect();

    let mut out: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    out.extend(tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])));
    out
}

type Vector = HashMap<String, f64>;

fn counts(terms: Vec<String>) -> Vector {
    let mut tf = Vector::new();
    for term in terms {
        *tf.entry(term).or_insert(0.0) += 1.0;
    }
    tf
}

/// TF-IDF vectors for `docs`, fitted on `docs` alone.
fn fit_transform(docs: &[&str], stopwords: &HashSet<&str>) -> Vec<Vector> {
    let tfs: Vec<Vector> = docs.iter().map(|d| counts(terms(d, stopwords))).collect();

    let mut df: HashMap<&str, f64> = HashMap::new();
    for tf in &tfs {
        for term in tf.keys() {
            *df.entry(term.as_str()).or_insert(0.0) += 1.0;
        }
    }

    let n = docs.len() as f64;
    let idf: HashMap<&str, f64> = df
        .into_iter()
        .map(|(term, d)| (term, ((1.0 + n) / (1.0 + d)).ln() + 1.0))
        .collect();

    tfs.iter()
        .map(|tf| {
            let mut v: Vector = tf
                .iter()
                .map(|(term, count)| (term.clone(), count * idf[term.as_str()]))
                .collect();
            let norm = v.values().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                v.values_mut().for_each(|w| *w /= norm);
            }
            v
        })
        .collect()
}

fn dot(a: &Vector, b: &Vector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|x| w * x))
        .sum()
}

/// Highest cosine similarity between `query` and any of `sentences`.
/// Zero when there are no sentences or no shared vocabulary at all.
pub fn best_sentence_similarity(query: &str, sentences: &[&str], stopwords: &HashSet<&str>) -> f64 {
    if sentences.is_empty() {
        return 0.0;
    }
    let mut docs = Vec::with_capacity(sentences.len() + 1);
    docs.push(query);
    docs.extend_from_slice(sentences);

    let vectors = fit_transform(&docs, stopwords);
    let (query_vec, rest) = match vectors.split_first() {
        Some(split) => split,
        None => return 0.0,
    };
    rest.iter()
        .map(|v| dot(query_vec, v))
        .fold(0.0, f64::max)
}

/// Relevance of an article (title + description) to `query`, in [0, 1].
pub fn article_score(query: &str, title: &str, description: &str, stopwords: &HashSet<&str>) -> f64 {
    let full_text = normalize(&format!("{title}. {description}"));
    let sentences = split_sentences(&full_text);
    best_sentence_similarity(&normalize(query), &sentences, stopwords).clamp(0.0, 1.0)
}
