//! Complexity Scorer (C3): a bounded score in [0,1] plus a band label.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Band;

const RISK_KEYWORDS: &[&str] = &[
    "analyze",
    "optimize",
    "summarize",
    "compare",
    "design",
    "explain",
    "policy",
    "architecture",
    "draft",
    "contract",
    "clause",
    "compliance",
    "legal",
    "governance",
    "security",
    "regulation",
    "migration",
];

const LONG_CONTEXT_CHAR_THRESHOLD: usize = 4000;

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)```|\bclass\s+\w|\bdef\s+\w|\bfunction\(").unwrap()
});
static JSON_SHAPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*:.*\}").unwrap());

fn keyword_hits(lower_prompt: &str) -> usize {
    RISK_KEYWORDS
        .iter()
        .filter(|kw| lower_prompt.contains(*kw))
        .count()
}

fn symbol_count(prompt: &str) -> usize {
    prompt
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count()
}

fn sentence_count(prompt: &str) -> usize {
    prompt
        .split(|c| c == '.' || c == '!' || c == '?')
        .filter(|s| !s.trim().is_empty())
        .count()
}

/// Weighted-sum complexity score, clamped to `[0, 1]`.
pub fn score(prompt: &str) -> f64 {
    let len = prompt.chars().count();
    let digits = prompt.chars().filter(|c| c.is_ascii_digit()).count();
    let symbols = symbol_count(prompt);
    let lower = prompt.to_ascii_lowercase();
    let hits = keyword_hits(&lower);

    let f_len = (len as f64 / 2000.0).min(1.0) * 0.45;
    let f_digits = (digits as f64 / 50.0).min(1.0) * 0.15;
    let f_symbols = (symbols as f64 / 80.0).min(1.0) * 0.10;
    let f_code = if CODE_FENCE_RE.is_match(prompt) { 0.20 } else { 0.0 };
    let f_json = if JSON_SHAPE_RE.is_match(prompt) { 0.20 } else { 0.0 };
    let f_sentences = (sentence_count(prompt) as f64 / 20.0).min(1.0) * 0.20;
    let f_keywords = (0.1 * hits as f64).min(0.3);

    (f_len + f_digits + f_symbols + f_code + f_json + f_sentences + f_keywords).clamp(0.0, 1.0)
}

/// Chooses an internal band label (`low`, `mid`, `high`, carrying
/// `long_context`/`complex` distinctions only for telemetry) for a prompt.
pub fn band(prompt: &str) -> Band {
    let len = prompt.chars().count();
    let s = score(prompt);
    let hits = keyword_hits(&prompt.to_ascii_lowercase());

    if len >= LONG_CONTEXT_CHAR_THRESHOLD {
        return Band::High;
    }
    if len >= 900 || s >= 0.65 || hits >= 3 {
        return Band::High;
    }
    if len <= 160 && s <= 0.12 && hits == 0 {
        return Band::Low;
    }
    if s < 0.35 && len < 350 && hits <= 1 {
        return Band::Low;
    }
    Band::Mid
}

/// The internal label the source would have used (`long_context`,
/// `complex`, `simple`, `moderate`), for `TraceRecord.inferred_band` only.
/// Never surfaced on `CompletionResponse.band`.
pub fn internal_label(prompt: &str) -> &'static str {
    let len = prompt.chars().count();
    let s = score(prompt);
    let hits = keyword_hits(&prompt.to_ascii_lowercase());

    if len >= LONG_CONTEXT_CHAR_THRESHOLD {
        return "long_context";
    }
    if len >= 900 || s >= 0.65 || hits >= 3 {
        return "complex";
    }
    if len <= 160 && s <= 0.12 && hits == 0 {
        return "simple";
    }
    if s < 0.35 && len < 350 && hits <= 1 {
        return "simple";
    }
    "moderate"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_trivial_prompt_is_low() {
        assert_eq!(band("Say hi"), Band::Low);
    }

    #[test]
    fn long_prompt_is_high_regardless_of_content() {
        let prompt = "a".repeat(4500);
        assert_eq!(band(&prompt), Band::High);
        assert_eq!(internal_label(&prompt), "long_context");
    }

    #[test]
    fn risk_keywords_promote_band() {
        let prompt = "Please analyze, optimize and design the compliance architecture for us.";
        assert_eq!(band(prompt), Band::High);
    }

    #[test]
    fn code_fence_raises_score() {
        let plain = score("just a short sentence");
        let coded = score("```rust\nfn main() {}\n```");
        assert!(coded > plain);
    }

    #[test]
    fn score_never_exceeds_one() {
        let prompt = format!(
            "analyze optimize summarize compare design explain policy architecture draft contract clause compliance legal governance security regulation migration {}",
            "1234567890".repeat(20)
        );
        assert!(score(&prompt) <= 1.0);
    }
}
