// classifier.rs — The intent classifier.
//
// classify(message, sender, channel) → Intent
//
//   1. Greeting at the start of the message → Conversation.
//   2. Lexical scores; none → Conversation @ 0.5 ("default").
//   3. Strategy ranking (keyword-only or hybrid).
//   4. Direct channels: weak Query/Command/Social → Conversation.
//
// The classifier has no side effects beyond the optional validator call.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::category::IntentCategory;
use crate::intent::{Intent, Principals};
use crate::lexical::LexicalClassifier;
use crate::validator::{BinaryValidator, ClassifierStrategy, HybridStrategy, KeywordOnly};

/// How a classification was produced. Recorded in intent metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Default,
    KeywordOnly,
    GemmaHybrid,
    ConversationOverride,
}

impl ClassificationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassificationMethod::Default => "default",
            ClassificationMethod::KeywordOnly => "keyword_only",
            ClassificationMethod::GemmaHybrid => "gemma_hybrid",
            ClassificationMethod::ConversationOverride => "conversation_override",
        }
    }
}

/// Tunables for the classifier.
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Channels where a person chats casually rather than issuing commands.
    pub direct_channels: HashSet<String>,
    /// On direct channels, a category score below this counts as weak.
    pub weak_score: f64,
    /// On direct channels, confidence below this allows the override.
    pub override_confidence: f64,
    pub top_n: usize,
    pub per_call_timeout: Duration,
    pub budget: Duration,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            direct_channels: ["whatsapp", "telegram", "discord", "sms"]
                .into_iter()
                .map(String::from)
                .collect(),
            weak_score: 0.1,
            override_confidence: 0.6,
            top_n: 3,
            per_call_timeout: Duration::from_millis(80),
            budget: Duration::from_millis(300),
        }
    }
}

/// Classifies raw messages into intents.
pub struct IntentClassifier {
    lexical: LexicalClassifier,
    strategy: Box<dyn ClassifierStrategy>,
    principals: Principals,
    settings: ClassifierSettings,
}

impl IntentClassifier {
    /// Keyword-only classifier.
    pub fn keyword_only(principals: Principals, settings: ClassifierSettings) -> Self {
        Self {
            lexical: LexicalClassifier::new(),
            strategy: Box::new(KeywordOnly),
            principals,
            settings,
        }
    }

    /// Hybrid classifier backed by an external binary validator.
    pub fn hybrid(
        principals: Principals,
        settings: ClassifierSettings,
        validator: Arc<dyn BinaryValidator>,
    ) -> Self {
        let strategy = HybridStrategy::new(
            validator,
            settings.top_n,
            settings.per_call_timeout,
            settings.budget,
        );
        Self {
            lexical: LexicalClassifier::new(),
            strategy: Box::new(strategy),
            principals,
            settings,
        }
    }

    pub fn principals(&self) -> &Principals {
        &self.principals
    }

    pub fn is_direct_channel(&self, channel: &str) -> bool {
        self.settings
            .direct_channels
            .contains(&channel.trim().to_ascii_lowercase())
    }

    /// Classify one message. Never fails: validator problems degrade to
    /// the keyword-only result and are noted in the intent's metadata.
    pub async fn classify(&self, message: &str, sender: &str, channel: &str) -> Intent {
        let authorized = self.principals.is_authorized(sender);
        let build = |category, confidence, method: ClassificationMethod| {
            Intent::new(message, category, confidence, sender, channel, authorized)
                .with_metadata("classification_method", method.as_str())
        };

        if self.lexical.starts_with_greeting(message) {
            return build(
                IntentCategory::Conversation,
                0.9,
                ClassificationMethod::ConversationOverride,
            )
            .with_metadata("override_reason", "greeting");
        }

        let scores = self.lexical.score(message);
        if scores.is_empty() {
            return build(IntentCategory::Conversation, 0.5, ClassificationMethod::Default);
        }

        let ranking = self.strategy.rank(message, &scores).await;
        let category_score = LexicalClassifier::score_for(&scores, ranking.category);

        let mut intent = if self.is_direct_channel(channel)
            && matches!(
                ranking.category,
                IntentCategory::Query | IntentCategory::Command | IntentCategory::Social
            )
            && category_score < self.settings.weak_score
            && ranking.confidence < self.settings.override_confidence
        {
            build(
                IntentCategory::Conversation,
                1.0 - ranking.confidence,
                ClassificationMethod::ConversationOverride,
            )
            .with_metadata("override_reason", "weak_signal_on_direct_channel")
            .with_metadata("overridden_category", ranking.category.as_str())
        } else {
            build(ranking.category, ranking.confidence, ranking.method)
        };

        intent.annotate("keyword_score", category_score);
        if let Some(reason) = ranking.degraded {
            intent.annotate("classification_degraded", reason);
        }

        tracing::debug!(
            category = %intent.category(),
            confidence = intent.confidence(),
            method = intent
                .metadata()
                .get("classification_method")
                .and_then(|m| m.as_str())
                .unwrap_or(""),
            "classified intent"
        );
        intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntentError;
    use async_trait::async_trait;

    fn keyword_classifier() -> IntentClassifier {
        IntentClassifier::keyword_only(Principals::new(["owner"]), ClassifierSettings::default())
    }

    #[tokio::test]
    async fn empty_signal_defaults_to_conversation() {
        let intent = keyword_classifier().classify("zzz", "someone", "webhook").await;
        assert_eq!(intent.category(), IntentCategory::Conversation);
        assert_eq!(intent.confidence(), 0.5);
        assert_eq!(intent.metadata()["classification_method"], "default");
    }

    #[tokio::test]
    async fn greeting_wins_over_other_hits() {
        let intent = keyword_classifier()
            .classify("hey, deploy and restart the service", "owner", "webhook")
            .await;
        assert_eq!(intent.category(), IntentCategory::Conversation);
        assert_eq!(intent.metadata()["classification_method"], "conversation_override");
    }

    #[tokio::test]
    async fn command_on_structured_channel_is_kept() {
        let intent = keyword_classifier()
            .classify("Edit modules/foo/src/bar.py to fix the crash", "owner", "webhook")
            .await;
        assert_eq!(intent.category(), IntentCategory::Command);
        assert!(intent.is_authorized_principal());
        assert_eq!(intent.metadata()["classification_method"], "keyword_only");
    }

    #[tokio::test]
    async fn weak_command_on_direct_channel_becomes_conversation() {
        // Single "fix" hit: score 1/21, confidence ~0.24.
        let intent = keyword_classifier()
            .classify("ugh i need a fix of coffee", "friend", "whatsapp")
            .await;
        assert_eq!(intent.category(), IntentCategory::Conversation);
        assert_eq!(intent.metadata()["overridden_category"], "command");
    }

    #[tokio::test]
    async fn strong_command_on_direct_channel_survives() {
        let intent = keyword_classifier()
            .classify("deploy, build and push the release, then run the migration", "owner", "whatsapp")
            .await;
        assert_eq!(intent.category(), IntentCategory::Command);
    }

    #[tokio::test]
    async fn authorization_is_computed_from_sender() {
        let classifier = keyword_classifier();
        assert!(classifier.classify("status?", "owner", "webhook").await.is_authorized_principal());
        assert!(!classifier.classify("status?", "stranger", "webhook").await.is_authorized_principal());
    }

    struct Down;

    #[async_trait]
    impl BinaryValidator for Down {
        async fn ask(&self, _prompt: &str) -> Result<String, IntentError> {
            Err(IntentError::Unavailable("offline".into()))
        }
        fn name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test]
    async fn degraded_validator_is_surfaced_only_in_metadata() {
        let classifier = IntentClassifier::hybrid(
            Principals::default(),
            ClassifierSettings::default(),
            Arc::new(Down),
        );
        let intent = classifier.classify("show me the docs", "x", "webhook").await;
        assert_eq!(intent.category(), IntentCategory::Query);
        assert_eq!(intent.metadata()["classification_method"], "keyword_only");
        assert!(intent.metadata().contains_key("classification_degraded"));
    }
}
