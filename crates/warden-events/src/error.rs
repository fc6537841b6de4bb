// error.rs — Error types for event sinks and containment files.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
