// error.rs — Error types for intent classification.

use thiserror::Error;

/// Errors raised by the external classification stage.
///
/// None of these ever leave the classifier: they are converted into a
/// keyword-only fallback and recorded in the intent's metadata.
#[derive(Debug, Error)]
pub enum IntentError {
    /// The validator endpoint could not be reached or returned a bad status.
    #[error("classifier validator unavailable: {0}")]
    Unavailable(String),

    /// A single validator call exceeded its per-call timeout.
    #[error("classifier validator timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The overall classification hop budget ran out.
    #[error("classification budget of {budget_ms}ms exhausted")]
    BudgetExhausted { budget_ms: u64 },

    /// The validator replied with a payload we could not decode.
    #[error("malformed validator response: {0}")]
    MalformedResponse(String),
}
