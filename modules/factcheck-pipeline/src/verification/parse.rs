//! Parse model responses into typed records, one function per prompt shape.
//!
//! All parsers are lenient: malformed input yields fewer results, never an
//! error.

use std::sync::OnceLock;

use regex::Regex;

use ai_client::strip_code_blocks;
use factcheck_common::{RiskLevel, Subclaim, VerificationResult};

/// Shown to the user when synthesis produced nothing usable.
pub const SYNTHESIS_FALLBACK: [&str; 2] = [
    "Ocorreu um erro ao resumir a análise deste vídeo.",
    "Por favor, tente novamente mais tarde.",
];

/// Justification attached when judging produced nothing usable.
pub const JUDGMENT_FALLBACK: &str = "The claim could not be judged automatically.";

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^[\s*_#>\-]*(?:\d+[.)]\s*)?(?:sub-?claim(?:\s*\d+)?|claim|evidence(?:\s+types?)?|quer(?:y|ies)|search\s+terms)\s*[*_]*\s*:\s*[*_]*\s*",
        )
        .expect("valid label regex")
    })
}

fn verdict_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[\s*_#>\-]*claim\s*\d+\s*[*_]*\s*:\s*(.*)$").expect("valid verdict regex")
    })
}

fn justification_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[\s*_#>\-]*justification\s*[*_]*\s*:\s*(.*)$")
            .expect("valid justification regex")
    })
}

fn strip_label(line: &str) -> &str {
    match label_re().find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line.trim(),
    }
}

fn split_list(line: &str) -> Vec<String> {
    strip_label(line)
        .split(',')
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Decomposition
// ---------------------------------------------------------------------------

/// Blocks separated by blank lines; each needs three non-empty lines
/// (sub-claim, evidence types, query) or it is dropped. At most `max` are
/// returned.
pub fn subclaims(raw: &str, max: usize) -> Vec<Subclaim> {
    fn flush(block: &mut Vec<&str>, out: &mut Vec<Subclaim>) {
        if block.len() >= 3 {
            let claim_text = strip_label(block[0]);
            if !claim_text.is_empty() {
                out.push(Subclaim::new(claim_text, split_list(block[1]), split_list(block[2])));
            }
        }
        block.clear();
    }

    let text = strip_code_blocks(raw);
    let mut out = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut block, &mut out);
        } else {
            block.push(line.trim());
        }
    }
    flush(&mut block, &mut out);

    out.truncate(max);
    out
}

// ---------------------------------------------------------------------------
// Judgment
// ---------------------------------------------------------------------------

/// One verdict per `Claim N:` line in the order they appear, with the
/// `Justification:` line that follows it.
///
/// The number after "Claim" is not checked; the k-th verdict belongs to the
/// k-th sub-claim.
pub fn verdicts(raw: &str) -> Vec<(VerificationResult, Option<String>)> {
    let mut out: Vec<(VerificationResult, Option<String>)> = Vec::new();
    for line in raw.lines() {
        if let Some(caps) = verdict_re().captures(line) {
            out.push((VerificationResult::from_label(&caps[1]), None));
        } else if let Some(caps) = justification_re().captures(line) {
            let text = caps[1].trim();
            if let Some(last) = out.last_mut() {
                if last.1.is_none() && !text.is_empty() {
                    last.1 = Some(text.to_string());
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub messages: Vec<String>,
    pub risk: Option<RiskLevel>,
}

fn line_key(line: &str) -> String {
    line.trim_start_matches(|c: char| matches!(c, '*' | '_' | '#' | '-' | '>' | ' '))
        .to_lowercase()
}

fn is_risk_line(line: &str) -> bool {
    let key = line_key(line);
    key.starts_with("risk") || key.starts_with("risco")
}

fn is_evidence_line(line: &str) -> bool {
    let key = line_key(line);
    key.starts_with("evidence") || key.starts_with("evidencia") || key.starts_with("evidência")
}

fn risk_level(line: &str) -> Option<RiskLevel> {
    let (_, rest) = line.split_once(':')?;
    rest.split_whitespace().next().and_then(RiskLevel::parse)
}

/// Risk line plus the first two evidence lines when the response is labeled,
/// otherwise every non-empty line. Empty input gives the fixed fallback.
pub fn synthesis(raw: &str) -> Synthesis {
    let text = strip_code_blocks(raw);
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if lines.is_empty() {
        return Synthesis {
            messages: SYNTHESIS_FALLBACK.iter().map(|s| s.to_string()).collect(),
            risk: None,
        };
    }

    let risk_line = lines.iter().find(|l| is_risk_line(l));
    let evidence: Vec<&String> = lines.iter().filter(|l| is_evidence_line(l)).take(2).collect();

    match risk_line {
        Some(risk) if !evidence.is_empty() => {
            let mut messages = vec![risk.clone()];
            messages.extend(evidence.into_iter().cloned());
            Synthesis {
                risk: risk_level(risk),
                messages,
            }
        }
        _ => Synthesis {
            risk: risk_line.and_then(|l| risk_level(l)),
            messages: lines,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BLOCKS: &str = "Subclaim: Lula signed a decree\nEvidence: official gazette, press release\nQuery: Lula decreto, decreto alimentos, preço alimentos, extra\n\nSubclaim: The decree lowers food prices\nEvidence: price statistics\nQuery: preço alimentos";

    #[test]
    fn well_formed_blocks_parse_in_order() {
        let parsed = subclaims(TWO_BLOCKS, 2);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].claim_text, "Lula signed a decree");
        assert_eq!(parsed[0].evidence_types, vec!["official gazette", "press release"]);
        assert_eq!(parsed[0].query, vec!["Lula decreto", "decreto alimentos", "preço alimentos"]);
        assert_eq!(parsed[1].query, vec!["preço alimentos"]);
        assert!(parsed.iter().all(|s| s.verification_result.is_none()));
    }

    #[test]
    fn short_block_is_dropped_not_an_error() {
        let raw = "Subclaim: only two lines\nEvidence: news\n\nSubclaim: complete\nEvidence: news\nQuery: termo";
        let parsed = subclaims(raw, 2);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].claim_text, "complete");
    }

    #[test]
    fn extra_blocks_are_ignored_and_garbage_yields_nothing() {
        assert_eq!(subclaims(TWO_BLOCKS, 1).len(), 1);
        assert!(subclaims("I cannot help with that.", 2).is_empty());
        assert!(subclaims("", 2).is_empty());
    }

    #[test]
    fn fenced_and_emphasised_labels_are_stripped() {
        let raw = "```\n**Subclaim 1:** Lula signed a decree\n- Evidence types: gazette\n- Queries: \"lula decreto\"\n```";
        let parsed = subclaims(raw, 2);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].claim_text, "Lula signed a decree");
        assert_eq!(parsed[0].evidence_types, vec!["gazette"]);
        assert_eq!(parsed[0].query, vec!["lula decreto"]);
    }

    #[test]
    fn verdicts_are_positional() {
        let raw = "Claim 1: Refuted-Beyond-Context\nJustification: No record exists.\nClaim 2: supported-by-context-only\nJustification: Only the video says so.";
        let parsed = verdicts(raw);
        assert_eq!(
            parsed,
            vec![
                (VerificationResult::RefutedBeyondContext, Some("No record exists.".to_string())),
                (VerificationResult::SupportedByContextOnly, Some("Only the video says so.".to_string())),
            ]
        );
    }

    #[test]
    fn verdict_numbers_are_not_validated() {
        let parsed = verdicts("Claim 2: Not-Verifiable\nClaim 7: Refuted-By-Context");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].0, VerificationResult::RefutedByContext);
        assert_eq!(parsed[0].1, None);
    }

    #[test]
    fn unknown_labels_map_to_not_verifiable() {
        let parsed = verdicts("Claim 1: Probably true\nJustification: hunch");
        assert_eq!(parsed[0].0, VerificationResult::NotVerifiable);
    }

    #[test]
    fn synthesis_keeps_risk_and_two_evidence_lines() {
        let raw = "Here you go:\nRisk: High - fabricated decree\nEvidence 1: No decree was published.\nEvidence 2: Audio shows edits.\nEvidence 3: extra";
        let s = synthesis(raw);
        assert_eq!(
            s.messages,
            vec![
                "Risk: High - fabricated decree",
                "Evidence 1: No decree was published.",
                "Evidence 2: Audio shows edits.",
            ]
        );
        assert_eq!(s.risk, Some(RiskLevel::High));
    }

    #[test]
    fn synthesis_accepts_portuguese_labels() {
        let s = synthesis("Risco: BAIXO\nEvidência 1: Fonte oficial confirma.\nEvidencia 2: N/A");
        assert_eq!(s.messages.len(), 3);
        assert_eq!(s.risk, Some(RiskLevel::Low));
    }

    #[test]
    fn unlabeled_synthesis_keeps_all_lines() {
        let s = synthesis("  first line \n\n second line ");
        assert_eq!(s.messages, vec!["first line", "second line"]);
        assert_eq!(s.risk, None);
    }

    #[test]
    fn empty_synthesis_gives_fallback() {
        let s = synthesis("   \n ");
        assert_eq!(s.messages, SYNTHESIS_FALLBACK.to_vec());
    }
}
