// error.rs — Error types for router construction and collaborator calls.
//
// `Router::process` never returns these; they surface only while building a
// router from configuration or inside collaborator implementations, where the
// pipeline converts them to safe text.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error(transparent)]
    Policy(#[from] warden_policy::PolicyError),

    #[error(transparent)]
    Guard(#[from] warden_guard::GuardError),

    #[error(transparent)]
    Audit(#[from] warden_audit::AuditError),

    #[error(transparent)]
    Events(#[from] warden_events::EventError),

    /// An execution or search backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}
