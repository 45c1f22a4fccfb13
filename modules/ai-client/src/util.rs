/// Strip a surrounding markdown code fence from a response.
///
/// Models sometimes wrap line-oriented answers in a fence with an arbitrary
/// language tag (```text, ```markdown). The tag line is dropped along with
/// the fence.
pub fn strip_code_blocks(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) if !rest[..idx].contains(' ') => &rest[idx + 1..],
        _ => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_with_any_language_tag() {
        assert_eq!(strip_code_blocks("```text\nRisk: High\n```"), "Risk: High");
        assert_eq!(strip_code_blocks("```\nClaim 1: Not-Verifiable\n```"), "Claim 1: Not-Verifiable");
        assert_eq!(strip_code_blocks("  Risk: Low  "), "Risk: Low");
    }
}
