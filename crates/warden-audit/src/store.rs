// store.rs — The outcome-store seam the router records into.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::AuditError;
use crate::log::OutcomeLog;
use crate::record::OutcomeRecord;

/// Append-only sink for execution outcomes.
///
/// Callers treat failures as non-fatal: a request never fails because its
/// outcome could not be stored.
pub trait OutcomeStore: Send + Sync {
    fn record(&self, record: OutcomeRecord) -> Result<(), AuditError>;
}

/// Default store: a hash-chained JSONL file shared behind a mutex.
pub struct JsonlOutcomeStore {
    path: PathBuf,
    log: Mutex<OutcomeLog>,
}

impl JsonlOutcomeStore {
    /// Open (or create) the JSONL log at `path`, resuming its hash chain.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let log = OutcomeLog::open(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            log: Mutex::new(log),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutcomeStore for JsonlOutcomeStore {
    fn record(&self, mut record: OutcomeRecord) -> Result<(), AuditError> {
        let mut log = match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        log.append(&mut record)?;
        tracing::debug!(
            record_id = %record.record_id,
            skill = %record.skill,
            success = record.success,
            "outcome recorded"
        );
        Ok(())
    }
}
