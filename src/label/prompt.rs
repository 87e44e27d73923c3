//! Prompt construction and response cleanup for topic labels.

use std::sync::LazyLock;

use regex::Regex;

/// Leading list markers and `Topic:`-style prefixes models like to add.
#[allow(clippy::expect_used)]
static LABEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[-*•]|\d+[.)])?\s*(?:(?:topic|label)\s*:)?\s*")
        .expect("label prefix regex is valid") // Static pattern, safe to panic
});

const QUOTES: &[char] = &['"', '\'', '`', '“', '”', '‘', '’'];

/// Builds the instruction sent to the text-generation service.
///
/// The few-shot examples bias the model toward short categorical phrases
/// instead of sentences.
#[must_use]
pub fn topic_prompt(review_text: &str) -> String {
    format!(
        r#"Extract the main issue, request, or feedback from this review in 3-5 words:

Review: {review_text}

Return ONLY the topic label, nothing else. Examples:
- "Delivery issue"
- "Food stale"
- "App crashes"
"#
    )
}

/// Normalizes raw model output into a bare label.
///
/// Keeps the first non-empty line, strips list markers, `Topic:` prefixes,
/// surrounding quotes and a trailing period. Returns an empty string when
/// nothing usable is left.
#[must_use]
pub fn clean_label(raw: &str) -> String {
    let Some(line) = raw.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return String::new();
    };

    let without_prefix = LABEL_PREFIX.replace(line, "");
    without_prefix
        .trim()
        .trim_matches(QUOTES)
        .trim()
        .trim_end_matches('.')
        .trim()
        .to_string()
}
