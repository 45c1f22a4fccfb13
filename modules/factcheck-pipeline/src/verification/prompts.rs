//! Prompt text for each verification step. Responses are parsed by the
//! matching function in `parse.rs`.

use factcheck_common::{ManipulationScores, NewsArticle, Subclaim, VerificationResult};

pub fn decomposition(claim: &str, context: &str, count: usize) -> String {
    format!(
        r#"You are a fact-checking assistant. Break the claim below into exactly {count} minimal sub-claims that can each be verified independently against news coverage.

For each sub-claim write exactly three lines, in this order, and separate sub-claims with one blank line:
Subclaim: <one short factual assertion>
Evidence: <comma-separated kinds of evidence that would confirm or refute it>
Query: <up to 3 short news search terms, comma-separated, in the language of the claim>

Do not number the sub-claims and do not add any other text.

Claim: {claim}
Context: {context}"#
    )
}

pub fn judgment(
    context: &str,
    caption: Option<&str>,
    scores: &ManipulationScores,
    news: &[NewsArticle],
    subclaims: &[Subclaim],
) -> String {
    let mut prompt = String::from(
        "You are a fact-checking assistant. Judge each numbered sub-claim using the video context, \
         the manipulation scores and the retrieved news headlines.\n\n",
    );

    prompt.push_str(&format!("Video context: {context}\n"));
    if let Some(caption) = caption {
        prompt.push_str(&format!("Video caption: {caption}\n"));
    }
    if let Some(video) = scores.video {
        prompt.push_str(&format!("Probability the video was manipulated: {video}\n"));
    }
    if let Some(audio) = scores.audio {
        prompt.push_str(&format!("Probability the audio was manipulated: {audio}\n"));
    }

    prompt.push_str("\nRetrieved news headlines:\n");
    if news.is_empty() {
        prompt.push_str("(none found)\n");
    }
    for article in news {
        prompt.push_str(&format!("- {}\n", article.title));
    }

    prompt.push_str("\nSub-claims:\n");
    for (i, subclaim) in subclaims.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, subclaim.claim_text));
    }

    let labels: Vec<&str> = VerificationResult::ALL.iter().map(|v| v.label()).collect();
    prompt.push_str(&format!(
        "\nFor every sub-claim, in order, answer with exactly two lines:\n\
         Claim N: <one of {}>\n\
         Justification: <one sentence>\n\
         Use no other labels and add no other text.",
        labels.join(", ")
    ));
    prompt
}

pub fn synthesis(claim: &str, subclaims: &[Subclaim], language: &str) -> String {
    let mut judged = String::new();
    for (i, subclaim) in subclaims.iter().enumerate() {
        let verdict = subclaim
            .verification_result
            .map(|v| v.label())
            .unwrap_or("Not judged");
        let justification = subclaim.justification.as_deref().unwrap_or("-");
        judged.push_str(&format!(
            "{}. {}\n   Verdict: {verdict}\n   Justification: {justification}\n",
            i + 1,
            subclaim.claim_text
        ));
    }

    format!(
        r#"You are a disinformation analyst writing a short reply to a social media user who asked whether a video is trustworthy.

Original claim: {claim}

Judged sub-claims:
{judged}
Answer in {language} with EXACTLY three lines and nothing else:
Risk: <High, Medium or Low, then a few words>
Evidence 1: <short sentence, at most 500 characters>
Evidence 2: <short sentence, at most 500 characters>
If an evidence line has nothing to say, write "N/A"."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use factcheck_common::Probability;

    #[test]
    fn judgment_omits_unknown_scores() {
        let subclaims = vec![Subclaim::new("Lula signed a decree", vec![], vec![])];
        let prompt = judgment("ctx", None, &ManipulationScores::default(), &[], &subclaims);
        assert!(!prompt.contains("manipulated"));
        assert!(prompt.contains("1. Lula signed a decree"));

        let scores = ManipulationScores::new(Probability::new(0.2).unwrap(), Probability::new(0.1).unwrap());
        let prompt = judgment("ctx", Some("caption"), &scores, &[], &subclaims);
        assert!(prompt.contains("video was manipulated: 0.20"));
        assert!(prompt.contains("audio was manipulated: 0.10"));
        assert!(prompt.contains("Video caption: caption"));
    }
}
