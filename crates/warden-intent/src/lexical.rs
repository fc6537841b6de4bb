// lexical.rs — Keyword pre-filter.
//
// Each category owns a keyword set. A category's score is the fraction of
// its keywords found on word boundaries in the lowercased message;
// categories with zero hits are dropped. A message that *starts* with a
// greeting is Conversation regardless of other hits.

use regex::Regex;

use crate::category::IntentCategory;

const QUERY_KEYWORDS: &[&str] = &[
    "what", "how", "why", "where", "when", "which", "who", "explain", "describe", "show",
    "find", "search", "look up", "tell me", "documentation", "docs", "meaning", "difference",
];

const COMMAND_KEYWORDS: &[&str] = &[
    "run", "execute", "deploy", "edit", "fix", "modify", "refactor", "delete", "create",
    "update", "rename", "install", "build", "write", "change", "implement", "add", "remove",
    "patch", "commit", "push",
];

const MONITOR_KEYWORDS: &[&str] = &[
    "status", "health", "uptime", "logs", "metrics", "monitor", "errors", "alerts",
    "dashboard", "latency", "cpu", "memory usage", "disk",
];

const CONVERSATION_KEYWORDS: &[&str] = &[
    "hello", "hi", "hey", "thanks", "thank you", "good morning", "good night", "how are you",
    "chat", "lol", "cool", "nice", "awesome",
];

const SOCIAL_KEYWORDS: &[&str] = &[
    "post", "tweet", "share", "followers", "comment", "reply", "likes", "subscribers",
    "youtube", "twitter", "instagram", "linkedin", "audience",
];

const SCHEDULE_KEYWORDS: &[&str] = &[
    "schedule", "remind", "reminder", "tomorrow", "later", "every day", "daily", "weekly",
    "calendar", "appointment", "tonight", "next week",
];

const SYSTEM_KEYWORDS: &[&str] = &[
    "restart", "reboot", "shutdown", "config", "configuration", "service", "daemon",
    "process", "kill", "upgrade", "reload", "environment",
];

/// Greeting tokens that force Conversation when they open a message.
const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "yo", "howdy", "greetings", "good morning", "good afternoon",
    "good evening",
];

/// One category's lexical score.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalScore {
    pub category: IntentCategory,
    /// Fraction of the category's keywords that matched, in `[0, 1]`.
    pub score: f64,
    pub hits: usize,
}

struct KeywordSet {
    category: IntentCategory,
    keyword_count: usize,
    patterns: Vec<Regex>,
}

/// The keyword pre-filter. Patterns are compiled once at construction.
pub struct LexicalClassifier {
    sets: Vec<KeywordSet>,
    greeting: Option<Regex>,
}

impl LexicalClassifier {
    pub fn new() -> Self {
        let sets = IntentCategory::ALL
            .iter()
            .map(|&category| {
                let keywords = keywords_for(category);
                KeywordSet {
                    category,
                    keyword_count: keywords.len(),
                    patterns: keywords.iter().filter_map(|kw| word_pattern(kw)).collect(),
                }
            })
            .collect();

        let alternation = GREETINGS
            .iter()
            .map(|g| regex::escape(g))
            .collect::<Vec<_>>()
            .join("|");
        let greeting = Regex::new(&format!(r"^\s*(?:{alternation})\b")).ok();

        Self { sets, greeting }
    }

    /// Whether the message opens with a greeting token.
    pub fn starts_with_greeting(&self, message: &str) -> bool {
        self.greeting
            .as_ref()
            .is_some_and(|g| g.is_match(&message.to_lowercase()))
    }

    /// Score every category, highest first. Zero-hit categories are omitted.
    pub fn score(&self, message: &str) -> Vec<LexicalScore> {
        let lowered = message.to_lowercase();
        let mut scores: Vec<LexicalScore> = self
            .sets
            .iter()
            .filter_map(|set| {
                let hits = set.patterns.iter().filter(|p| p.is_match(&lowered)).count();
                (hits > 0).then(|| LexicalScore {
                    category: set.category,
                    score: hits as f64 / set.keyword_count as f64,
                    hits,
                })
            })
            .collect();

        // Stable sort keeps ALL order as the tie-breaker.
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        scores
    }

    /// Score for one category (0.0 when it had no hits).
    pub fn score_for(scores: &[LexicalScore], category: IntentCategory) -> f64 {
        scores
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.score)
            .unwrap_or(0.0)
    }
}

impl Default for LexicalClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn keywords_for(category: IntentCategory) -> &'static [&'static str] {
    match category {
        IntentCategory::Query => QUERY_KEYWORDS,
        IntentCategory::Command => COMMAND_KEYWORDS,
        IntentCategory::Monitor => MONITOR_KEYWORDS,
        IntentCategory::Conversation => CONVERSATION_KEYWORDS,
        IntentCategory::Social => SOCIAL_KEYWORDS,
        IntentCategory::Schedule => SCHEDULE_KEYWORDS,
        IntentCategory::System => SYSTEM_KEYWORDS,
    }
}

/// Word-boundary pattern for a (possibly multi-word) keyword.
///
/// A keyword that fails to compile is skipped: it never matches.
fn word_pattern(keyword: &str) -> Option<Regex> {
    let body = keyword
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    Regex::new(&format!(r"\b{body}\b")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_fractions_of_keyword_sets() {
        let lexical = LexicalClassifier::new();
        let scores = lexical.score("Edit modules/foo/src/bar.py to fix the crash");

        let command = &scores[0];
        assert_eq!(command.category, IntentCategory::Command);
        assert_eq!(command.hits, 2);
        assert!((command.score - 2.0 / COMMAND_KEYWORDS.len() as f64).abs() < 1e-9);
    }

    #[test]
    fn zero_hit_categories_are_dropped() {
        let lexical = LexicalClassifier::new();
        assert!(lexical.score("zzz qqq").is_empty());
    }

    #[test]
    fn keywords_respect_word_boundaries() {
        let lexical = LexicalClassifier::new();
        // "history" contains "hi", "showcase" contains "show"; neither counts.
        let scores = lexical.score("history showcase");
        assert!(scores.is_empty(), "unexpected hits: {scores:?}");
    }

    #[test]
    fn multi_word_keywords_match_across_whitespace() {
        let lexical = LexicalClassifier::new();
        let scores = lexical.score("remind me   next  week");
        assert_eq!(scores[0].category, IntentCategory::Schedule);
        assert_eq!(scores[0].hits, 2);
    }

    #[test]
    fn greeting_detection_is_anchored() {
        let lexical = LexicalClassifier::new();
        assert!(lexical.starts_with_greeting("Hey, can you deploy?"));
        assert!(lexical.starts_with_greeting("  good morning team"));
        assert!(!lexical.starts_with_greeting("They said hi"));
        assert!(!lexical.starts_with_greeting("history of the repo"));
    }

    #[test]
    fn score_for_missing_category_is_zero() {
        let lexical = LexicalClassifier::new();
        let scores = lexical.score("deploy it");
        assert_eq!(LexicalClassifier::score_for(&scores, IntentCategory::Social), 0.0);
        assert!(LexicalClassifier::score_for(&scores, IntentCategory::Command) > 0.0);
    }
}
