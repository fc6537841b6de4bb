// error.rs — Error types for boundary defenses.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    /// A built-in detection pattern failed to compile.
    #[error("invalid detection pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A rate or capacity that must be positive was not.
    #[error("invalid rate limit setting {field} = {value}: must be a positive number")]
    InvalidRateLimit { field: &'static str, value: f64 },
}
