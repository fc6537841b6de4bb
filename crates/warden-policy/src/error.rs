// error.rs — Error types for the policy subsystem.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during policy operations.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy file could not be read.
    #[error("failed to read policy file at {path}: {source}")]
    PolicyFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The policy file is not valid YAML for a manifest set.
    #[error("invalid policy file: {0}")]
    PolicyParse(#[from] serde_yaml::Error),

    /// The permission backend could not give a definitive answer.
    #[error("permission backend unavailable: {0}")]
    BackendUnavailable(String),
}
