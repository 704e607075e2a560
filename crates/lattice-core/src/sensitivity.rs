//! Sensitivity Tagger (C4): regex/keyword tags for PII/PHI/financial terms.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\+?\d{1,3}[ -]?)?\(?\d{3}\)?[ -]?\d{3}[ -]?\d{4}\b").unwrap()
});
static CREDIT_CARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){13,16}\b").unwrap());

const PHI_KEYWORDS: &[&str] = &["doctor", "diagnosis", "prescription", "hospital", "patient", "medical"];
const FINANCIAL_KEYWORDS: &[&str] = &["salary", "bank", "loan", "credit", "mortgage", "account number"];

fn has_keyword(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| lower.contains(kw))
}

/// Returns a sorted, deduplicated list of tags drawn from the fixed
/// taxonomy: `PII_EMAIL`, `PII_PHONE`, `PII_FINANCIAL_CARD`, `PHI_MEDICAL`,
/// `FINANCIAL_TERMS`.
pub fn tags(text: &str) -> Vec<String> {
    let lower = text.to_ascii_lowercase();
    let mut found = Vec::new();

    if EMAIL_RE.is_match(text) {
        found.push("PII_EMAIL");
    }
    if PHONE_RE.is_match(text) {
        found.push("PII_PHONE");
    }
    if CREDIT_CARD_RE.is_match(text) {
        found.push("PII_FINANCIAL_CARD");
    }
    if has_keyword(&lower, PHI_KEYWORDS) {
        found.push("PHI_MEDICAL");
    }
    if has_keyword(&lower, FINANCIAL_KEYWORDS) {
        found.push("FINANCIAL_TERMS");
    }

    found.sort_unstable();
    found.dedup();
    found.into_iter().map(String::from).collect()
}

/// Unions and re-sorts two tag sets (prompt tags and response/cached tags).
pub fn union(mut a: Vec<String>, b: Vec<String>) -> Vec<String> {
    a.extend(b);
    a.sort_unstable();
    a.dedup();
    a
}

/// True for any tag the metrics aggregator should count as a sensitivity
/// hit — matches the source's broader `PII*`/`PHI*` prefix rule rather
/// than only the literal `PII_` tags.
pub fn is_sensitive_tag(tag: &str) -> bool {
    let upper = tag.to_ascii_uppercase();
    upper.starts_with("PII") || upper.starts_with("PHI")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_email_and_financial_terms() {
        let found = tags("email me at jane@example.com about my loan");
        assert!(found.contains(&"PII_EMAIL".to_string()));
        assert!(found.contains(&"FINANCIAL_TERMS".to_string()));
    }

    #[test]
    fn tags_are_sorted_and_deduplicated() {
        let found = tags("call me at 555-123-4567 or email jane@example.com, also 555-123-4567");
        let mut sorted = found.clone();
        sorted.sort_unstable();
        assert_eq!(found, sorted);
        let mut deduped = found.clone();
        deduped.dedup();
        assert_eq!(found, deduped);
    }

    #[test]
    fn plain_text_yields_no_tags() {
        assert!(tags("What's a good recipe for pancakes?").is_empty());
    }

    #[test]
    fn medical_keyword_detected() {
        assert!(tags("my doctor gave me a new prescription")
            .contains(&"PHI_MEDICAL".to_string()));
    }

    #[test]
    fn sensitive_tag_prefix_rule_is_case_insensitive() {
        assert!(is_sensitive_tag("PII_EMAIL"));
        assert!(is_sensitive_tag("phi_medical"));
        assert!(!is_sensitive_tag("FINANCIAL_TERMS"));
    }
}
