// record.rs — One execution outcome.
//
// Records keep only short excerpts of the request and response. Full text
// is represented by its SHA-256 so identical inputs can still be grouped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hasher;

/// Maximum characters kept in `input_excerpt` / `output_excerpt`.
pub const EXCERPT_LIMIT: usize = 200;

/// One executed request, as persisted to the outcome log.
///
/// Only excerpts and hashes of the input and output are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeRecord {
    pub record_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// The route that handled the request (e.g. "command_execution").
    pub skill: String,
    pub category: String,
    pub tier: String,
    pub success: bool,
    /// 1.0 for a clean response, lower per violation.
    pub fidelity: f64,
    pub duration_ms: u64,
    #[serde(default)]
    pub violations: Vec<String>,
    #[serde(default)]
    pub input_excerpt: String,
    #[serde(default)]
    pub output_excerpt: String,
    #[serde(default)]
    pub input_hash: String,
    #[serde(default)]
    pub output_hash: String,
    /// Hash of the preceding JSONL line. Set by the log on append.
    #[serde(default)]
    pub previous_hash: Option<String>,
}

impl OutcomeRecord {
    pub fn new(
        skill: impl Into<String>,
        category: impl Into<String>,
        tier: impl Into<String>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            skill: skill.into(),
            category: category.into(),
            tier: tier.into(),
            success: false,
            fidelity: 0.0,
            duration_ms: 0,
            violations: Vec::new(),
            input_excerpt: String::new(),
            output_excerpt: String::new(),
            input_hash: hasher::hash_str(""),
            output_hash: hasher::hash_str(""),
            previous_hash: None,
        }
    }

    /// Store a bounded excerpt and the full-text hash of the request.
    pub fn with_input(mut self, input: &str) -> Self {
        self.input_excerpt = excerpt(input, EXCERPT_LIMIT);
        self.input_hash = hasher::hash_str(input);
        self
    }

    /// Store a bounded excerpt and the full-text hash of the reply.
    pub fn with_output(mut self, output: &str) -> Self {
        self.output_excerpt = excerpt(output, EXCERPT_LIMIT);
        self.output_hash = hasher::hash_str(output);
        self
    }

    /// Record success, fidelity score and wall-clock duration.
    pub fn with_result(mut self, success: bool, fidelity: f64, duration_ms: u64) -> Self {
        self.success = success;
        self.fidelity = fidelity.clamp(0.0, 1.0);
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_violations(mut self, violations: Vec<String>) -> Self {
        self.violations = violations;
        self
    }
}

/// The first `limit` characters of `text` (never splits a UTF-8 sequence).
pub fn excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpts_are_bounded_by_characters() {
        let long = "é".repeat(500);
        let record = OutcomeRecord::new("conversation", "conversation", "advisory")
            .with_input(&long)
            .with_output("short");
        assert_eq!(record.input_excerpt.chars().count(), EXCERPT_LIMIT);
        assert_eq!(record.output_excerpt, "short");
        assert_eq!(record.input_hash, hasher::hash_str(&long));
    }

    #[test]
    fn fidelity_is_clamped() {
        let record = OutcomeRecord::new("s", "c", "t").with_result(true, 1.7, 5);
        assert_eq!(record.fidelity, 1.0);
        let record = OutcomeRecord::new("s", "c", "t").with_result(false, -0.5, 5);
        assert_eq!(record.fidelity, 0.0);
    }

    #[test]
    fn excerpt_of_short_text_is_identity() {
        assert_eq!(excerpt("abc", 200), "abc");
        assert_eq!(excerpt("abcdef", 3), "abc");
        assert_eq!(excerpt("", 3), "");
    }
}
