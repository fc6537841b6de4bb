// validate.rs — Output validation and outcome recording.
//
// validate_and_record(plan, raw, duration):
//   empty response          → fixed "unable to respond" text + violation
//   secret-shaped substring → whole response replaced by a redaction notice
//                             + violation
//   fidelity = max(0, 1 − 0.25 × violations)
//   outcome store write     → failure is logged, never returned

use std::sync::Arc;

use serde::Serialize;

use warden_audit::{OutcomeRecord, OutcomeStore};
use warden_guard::SecretScanner;

use crate::plan::ExecutionPlan;

/// Substituted for an empty handler reply.
pub const EMPTY_RESPONSE: &str =
    "I was unable to generate a response to that. Please rephrase it or try again later.";

/// Substituted for any reply containing a secret-shaped string.
pub const REDACTED_RESPONSE: &str =
    "That response was withheld because it contained credential-like content. Nothing sensitive was shared.";

const VIOLATION_PENALTY: f64 = 0.25;

/// The validated outcome of one executed plan.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub plan: ExecutionPlan,
    pub success: bool,
    pub response_text: String,
    pub duration_ms: u64,
    pub violations: Vec<String>,
    pub fidelity: f64,
    pub learning_stored: bool,
}

/// Checks handler output and records the outcome.
pub struct OutputValidator {
    scanner: SecretScanner,
    store: Option<Arc<dyn OutcomeStore>>,
}

impl OutputValidator {
    pub fn new(scanner: SecretScanner, store: Option<Arc<dyn OutcomeStore>>) -> Self {
        Self { scanner, store }
    }

    /// Replace empty or secret-bearing replies, score fidelity and persist
    /// an outcome record. A failing store is logged, never propagated.
    pub fn validate_and_record(
        &self,
        plan: ExecutionPlan,
        raw_response: String,
        duration_ms: u64,
    ) -> ExecutionResult {
        let mut violations = Vec::new();
        let mut response = raw_response;

        if response.trim().is_empty() {
            violations.push("empty_response".to_string());
            response = EMPTY_RESPONSE.to_string();
        }

        let leaked = self.scanner.count(&response);
        if leaked > 0 {
            tracing::warn!(
                route = %plan.route,
                sender = plan.intent.sender(),
                matches = leaked,
                "secret-shaped output redacted"
            );
            violations.push(format!("secret_leak:{leaked}"));
            response = REDACTED_RESPONSE.to_string();
        }

        let fidelity = fidelity(violations.len());
        let success = violations.is_empty();

        let learning_stored = match &self.store {
            Some(store) => {
                let record = OutcomeRecord::new(
                    plan.route.clone(),
                    plan.category().as_str(),
                    plan.tier.as_str(),
                )
                .with_input(plan.intent.raw_message())
                .with_output(&response)
                .with_result(success, fidelity, duration_ms)
                .with_violations(violations.clone());
                match store.record(record) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, route = %plan.route, "failed to store outcome");
                        false
                    }
                }
            }
            None => false,
        };

        ExecutionResult {
            plan,
            success,
            response_text: response,
            duration_ms,
            violations,
            fidelity,
            learning_stored,
        }
    }
}

fn fidelity(violations: usize) -> f64 {
    (1.0 - VIOLATION_PENALTY * violations as f64).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan;
    use warden_audit::{AuditError, JsonlOutcomeStore, OutcomeLog};
    use warden_intent::{Intent, IntentCategory};
    use warden_policy::AutonomyTier;

    struct Broken;

    impl OutcomeStore for Broken {
        fn record(&self, _record: OutcomeRecord) -> Result<(), AuditError> {
            Err(AuditError::WriteFailed(std::io::Error::other("disk full")))
        }
    }

    fn sample_plan() -> ExecutionPlan {
        let intent = Intent::new("how are builds?", IntentCategory::Query, 0.7, "a", "webhook", false);
        plan(intent, AutonomyTier::Advisory, true, Vec::new())
    }

    fn validator(store: Option<Arc<dyn OutcomeStore>>) -> OutputValidator {
        OutputValidator::new(SecretScanner::new().unwrap(), store)
    }

    #[test]
    fn clean_response_passes_through() {
        let result = validator(None).validate_and_record(sample_plan(), "All green.".into(), 12);
        assert!(result.success);
        assert_eq!(result.fidelity, 1.0);
        assert_eq!(result.response_text, "All green.");
        assert!(!result.learning_stored);
    }

    #[test]
    fn empty_response_is_rewritten() {
        let result = validator(None).validate_and_record(sample_plan(), "   ".into(), 3);
        assert_eq!(result.response_text, EMPTY_RESPONSE);
        assert_eq!(result.violations, vec!["empty_response"]);
        assert_eq!(result.fidelity, 0.75);
        assert!(!result.success);
    }

    #[test]
    fn secret_shaped_output_is_redacted() {
        let raw = "sure, use sk-ant-REDACTED for that".to_string();
        let result = validator(None).validate_and_record(sample_plan(), raw, 5);
        assert_eq!(result.response_text, REDACTED_RESPONSE);
        assert!(!result.violations.is_empty());
        assert!(result.fidelity < 1.0);
    }

    #[test]
    fn outcome_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");
        let store = Arc::new(JsonlOutcomeStore::open(&path).unwrap());
        let result = validator(Some(store)).validate_and_record(sample_plan(), "ok".into(), 40);
        assert!(result.learning_stored);

        let records = OutcomeLog::read_all(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].skill, "knowledge_search");
        assert_eq!(records[0].tier, "advisory");
        assert_eq!(records[0].duration_ms, 40);
    }

    #[test]
    fn store_failure_is_not_fatal() {
        let result = validator(Some(Arc::new(Broken))).validate_and_record(sample_plan(), "ok".into(), 1);
        assert!(result.success);
        assert!(!result.learning_stored);
        assert_eq!(result.response_text, "ok");
    }
}
