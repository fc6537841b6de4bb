// error.rs — Scanner failures. Every variant means "scanner unavailable".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scanner binary '{binary}' not found on PATH")]
    NotFound { binary: String },

    #[error("failed to run scanner: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("scanner timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("scanner exited with {status}: {stderr}")]
    Crashed { status: String, stderr: String },

    #[error("unreadable scanner report: {0}")]
    MalformedReport(String),
}
