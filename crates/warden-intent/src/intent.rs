// intent.rs — The classified representation of one inbound request.
//
// An Intent is created once by the classifier and is read-only afterwards,
// with one exception: `demote()` may lower the category to Conversation
// (the safest route). There is no way to promote a category, and the
// authorization flag has no setter at all.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::category::IntentCategory;

/// The set of senders allowed to hold elevated autonomy.
#[derive(Debug, Clone, Default)]
pub struct Principals {
    authorized: HashSet<String>,
}

impl Principals {
    pub fn new<I, S>(authorized: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authorized: authorized
                .into_iter()
                .map(|s| s.into().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Exact match on the trimmed sender identity.
    pub fn is_authorized(&self, sender: &str) -> bool {
        self.authorized.contains(sender.trim())
    }
}

/// A classified request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    raw_message: String,
    category: IntentCategory,
    confidence: f64,
    sender: String,
    channel: String,
    session_key: String,
    is_authorized_principal: bool,
    extracted_task: String,
    target_route: Option<String>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl Intent {
    /// Build an intent. Confidence is clamped to `[0, 1]` and the target
    /// route defaults to the category's route.
    pub fn new(
        raw_message: impl Into<String>,
        category: IntentCategory,
        confidence: f64,
        sender: impl Into<String>,
        channel: impl Into<String>,
        is_authorized_principal: bool,
    ) -> Self {
        let raw_message = raw_message.into();
        let extracted_task = extract_task(&raw_message);
        Self {
            raw_message,
            category,
            confidence: clamp_unit(confidence),
            sender: sender.into(),
            channel: channel.into(),
            session_key: String::new(),
            is_authorized_principal,
            extracted_task,
            target_route: Some(category.route().to_string()),
            metadata: Map::new(),
        }
    }

    pub fn with_session_key(mut self, session_key: impl Into<String>) -> Self {
        self.session_key = session_key.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The message exactly as received.
    pub fn raw_message(&self) -> &str {
        &self.raw_message
    }

    pub fn category(&self) -> IntentCategory {
        self.category
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn is_authorized_principal(&self) -> bool {
        self.is_authorized_principal
    }

    /// The message with leading mentions and slash commands removed.
    pub fn extracted_task(&self) -> &str {
        &self.extracted_task
    }

    pub fn target_route(&self) -> Option<&str> {
        self.target_route.as_deref()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Annotate the intent for observability. Never affects routing.
    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// One-way demotion to `Conversation`.
    ///
    /// Records the original category and the reason in metadata. Calling it
    /// on an intent that is already `Conversation` only records the reason.
    pub fn demote(&mut self, reason: &str) {
        if self.category != IntentCategory::Conversation {
            self.metadata.insert(
                "demoted_from".to_string(),
                Value::String(self.category.as_str().to_string()),
            );
        }
        self.metadata
            .insert("demotion_reason".to_string(), Value::String(reason.to_string()));
        self.category = IntentCategory::Conversation;
        self.target_route = Some(IntentCategory::Conversation.route().to_string());
    }

    /// Whether `demote()` has been applied.
    pub fn was_demoted(&self) -> bool {
        self.metadata.contains_key("demotion_reason")
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Strip leading @mentions and slash-command prefixes, collapse whitespace.
fn extract_task(message: &str) -> String {
    let mut words = message.split_whitespace().peekable();
    while let Some(word) = words.peek() {
        if word.starts_with('@') || (word.starts_with('/') && word.len() > 1 && !word[1..].contains('/')) {
            words.next();
        } else {
            break;
        }
    }
    words.collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principals_match_exact_trimmed_sender() {
        let principals = Principals::new(["+15550100", " owner@example.com "]);
        assert!(principals.is_authorized("+15550100"));
        assert!(principals.is_authorized("owner@example.com"));
        assert!(!principals.is_authorized("+15550101"));
        assert!(!principals.is_authorized(""));
    }

    #[test]
    fn confidence_is_clamped() {
        let high = Intent::new("x", IntentCategory::Query, 3.2, "s", "c", false);
        let low = Intent::new("x", IntentCategory::Query, -1.0, "s", "c", false);
        let nan = Intent::new("x", IntentCategory::Query, f64::NAN, "s", "c", false);
        assert_eq!(high.confidence(), 1.0);
        assert_eq!(low.confidence(), 0.0);
        assert_eq!(nan.confidence(), 0.0);
    }

    #[test]
    fn demote_lowers_to_conversation_and_records_origin() {
        let mut intent = Intent::new("deploy now", IntentCategory::Command, 0.9, "s", "c", false);
        intent.demote("unauthorized principal");

        assert_eq!(intent.category(), IntentCategory::Conversation);
        assert_eq!(intent.target_route(), Some("conversation"));
        assert_eq!(intent.metadata()["demoted_from"], "command");
        assert!(intent.was_demoted());
    }

    #[test]
    fn extracted_task_drops_mentions_and_slash_prefix() {
        let intent = Intent::new(
            "@bot /ask   what   is the status",
            IntentCategory::Query,
            0.5,
            "s",
            "c",
            false,
        );
        assert_eq!(intent.extracted_task(), "what is the status");
    }

    #[test]
    fn extracted_task_keeps_leading_paths() {
        let intent = Intent::new("/etc/hosts looks wrong", IntentCategory::Query, 0.5, "s", "c", false);
        assert_eq!(intent.extracted_task(), "/etc/hosts looks wrong");
    }
}
