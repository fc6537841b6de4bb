// validator.rs — External binary validation of lexical candidates.
//
// The classifier picks a strategy at construction time:
//
//   KeywordOnly    : lexical result scaled into [0, 1]
//   HybridStrategy : top-N lexical candidates are each put to an external
//                    YES/NO classifier; finalScore = kw*0.3 + ext*0.7
//
// The hybrid strategy owns its own failure handling: any validator error,
// per-call timeout, or exhausted hop budget turns into the KeywordOnly
// result plus a `degraded` note. Nothing propagates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::category::IntentCategory;
use crate::classifier::ClassificationMethod;
use crate::error::IntentError;
use crate::lexical::LexicalScore;

/// Lexical scores are keyword fractions; this maps a typical two or three
/// keyword hit into the upper half of `[0, 1]`.
pub const LEXICAL_SCALE: f64 = 5.0;

const YES_SCORE: f64 = 0.85;
const NO_SCORE: f64 = 0.10;
const UNPARSEABLE_SCORE: f64 = 0.50;

const KEYWORD_WEIGHT: f64 = 0.3;
const EXTERNAL_WEIGHT: f64 = 0.7;

/// A binary classifier that answers one YES/NO prompt.
///
/// Implementations should decode deterministically with a tiny token budget.
#[async_trait]
pub trait BinaryValidator: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, IntentError>;

    /// Short name for logs and metadata.
    fn name(&self) -> &str;
}

/// Map a raw validator reply to a score: YES → 0.85, NO → 0.10, else 0.50.
pub fn parse_verdict(reply: &str) -> f64 {
    let normalized = reply
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_uppercase();
    if normalized.starts_with("YES") {
        YES_SCORE
    } else if normalized.starts_with("NO") {
        NO_SCORE
    } else {
        UNPARSEABLE_SCORE
    }
}

/// The outcome of a strategy's ranking pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub category: IntentCategory,
    pub confidence: f64,
    pub method: ClassificationMethod,
    /// Why the external stage was skipped, if it was.
    pub degraded: Option<String>,
}

/// Picks a winner among non-empty lexical candidates.
#[async_trait]
pub trait ClassifierStrategy: Send + Sync {
    async fn rank(&self, message: &str, candidates: &[LexicalScore]) -> Ranking;
}

/// Pure lexical ranking.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordOnly;

impl KeywordOnly {
    fn rank_sync(candidates: &[LexicalScore]) -> Ranking {
        match candidates.first() {
            Some(top) => Ranking {
                category: top.category,
                confidence: (top.score * LEXICAL_SCALE).min(1.0),
                method: ClassificationMethod::KeywordOnly,
                degraded: None,
            },
            None => Ranking {
                category: IntentCategory::Conversation,
                confidence: 0.5,
                method: ClassificationMethod::Default,
                degraded: None,
            },
        }
    }
}

#[async_trait]
impl ClassifierStrategy for KeywordOnly {
    async fn rank(&self, _message: &str, candidates: &[LexicalScore]) -> Ranking {
        Self::rank_sync(candidates)
    }
}

/// Lexical pre-filter refined by an external binary classifier.
pub struct HybridStrategy {
    validator: Arc<dyn BinaryValidator>,
    top_n: usize,
    per_call_timeout: Duration,
    budget: Duration,
}

impl HybridStrategy {
    pub fn new(
        validator: Arc<dyn BinaryValidator>,
        top_n: usize,
        per_call_timeout: Duration,
        budget: Duration,
    ) -> Self {
        Self {
            validator,
            top_n: top_n.max(1),
            per_call_timeout,
            budget,
        }
    }

    async fn validate_candidates(
        &self,
        message: &str,
        candidates: &[LexicalScore],
    ) -> Result<Vec<(IntentCategory, f64)>, IntentError> {
        let deadline = Instant::now() + self.budget;
        let mut combined = Vec::with_capacity(self.top_n);

        for candidate in candidates.iter().take(self.top_n) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(IntentError::BudgetExhausted {
                    budget_ms: self.budget.as_millis() as u64,
                });
            }
            let call_timeout = self.per_call_timeout.min(remaining);
            let prompt = build_prompt(message, candidate.category);

            let reply = tokio::time::timeout(call_timeout, self.validator.ask(&prompt))
                .await
                .map_err(|_| IntentError::Timeout {
                    timeout_ms: call_timeout.as_millis() as u64,
                })??;

            let external = parse_verdict(&reply);
            let score = candidate.score * KEYWORD_WEIGHT + external * EXTERNAL_WEIGHT;
            tracing::debug!(
                category = %candidate.category,
                keyword_score = candidate.score,
                external,
                score,
                "validator verdict"
            );
            combined.push((candidate.category, score));
        }

        Ok(combined)
    }
}

#[async_trait]
impl ClassifierStrategy for HybridStrategy {
    async fn rank(&self, message: &str, candidates: &[LexicalScore]) -> Ranking {
        if candidates.is_empty() {
            return KeywordOnly::rank_sync(candidates);
        }

        match self.validate_candidates(message, candidates).await {
            Ok(combined) => {
                // First maximum wins, so lexical order breaks ties.
                let mut best = combined[0];
                for &(category, score) in &combined[1..] {
                    if score > best.1 {
                        best = (category, score);
                    }
                }
                Ranking {
                    category: best.0,
                    confidence: best.1.clamp(0.0, 1.0),
                    method: ClassificationMethod::GemmaHybrid,
                    degraded: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    validator = self.validator.name(),
                    error = %e,
                    "classification degraded to keyword-only"
                );
                Ranking {
                    degraded: Some(e.to_string()),
                    ..KeywordOnly::rank_sync(candidates)
                }
            }
        }
    }
}

fn build_prompt(message: &str, category: IntentCategory) -> String {
    format!(
        "You are a strict intent classifier. Answer with exactly one word: YES or NO.\n\
         Category '{}': {}.\n\
         Message: \"{}\"\n\
         Is this message an instance of category '{}'?",
        category.as_str(),
        category.describe(),
        message.replace('"', "'"),
        category.as_str()
    )
}
