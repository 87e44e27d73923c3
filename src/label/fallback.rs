//! Deterministic keyword classifier used when the generation service fails.

use tracing::instrument;

/// Label returned when no keyword rule matches.
pub const GENERAL_COMPLAINT: &str = "General complaint";

/// One substring rule: every group in `all_of` must have at least one hit.
#[derive(Debug, Clone, Copy)]
struct KeywordRule {
    all_of: &'static [&'static [&'static str]],
    label: &'static str,
}

impl KeywordRule {
    fn matches(&self, lowered: &str) -> bool {
        self.all_of
            .iter()
            .all(|any_of| any_of.iter().any(|keyword| lowered.contains(keyword)))
    }
}

/// Rules are evaluated in order; the first match wins.
const RULES: &[KeywordRule] = &[
    KeywordRule {
        all_of: &[&["delivery"], &["late", "delay"]],
        label: "Delivery issue",
    },
    KeywordRule {
        all_of: &[&["rude", "misbehave"]],
        label: "Delivery partner rude",
    },
    KeywordRule {
        all_of: &[&["crash"]],
        label: "App crashes",
    },
    KeywordRule {
        all_of: &[&["stale", "quality"]],
        label: "Food stale",
    },
    KeywordRule {
        all_of: &[&["payment"], &["fail"]],
        label: "Payment failed",
    },
];

/// Fixed-rule substring classifier over lowercased review text.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Creates the classifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classifies review text, defaulting to [`GENERAL_COMPLAINT`].
    #[must_use]
    #[instrument(skip_all)]
    pub fn classify(&self, review_text: &str) -> &'static str {
        let lowered = review_text.to_lowercase();
        RULES
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map_or(GENERAL_COMPLAINT, |rule| rule.label)
    }
}
