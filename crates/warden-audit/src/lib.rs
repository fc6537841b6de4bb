//! # warden-audit
//!
//! Append-only outcome records for Warden.
//!
//! Every request the router executes ends in an [`OutcomeRecord`]: which
//! skill ran, whether it succeeded, the fidelity score, timing, policy
//! violations, and short excerpts of input and output. Records are written
//! as JSONL, each linked to the previous line by SHA-256 so that edits,
//! insertions or deletions are detectable with [`OutcomeLog::verify_chain`].
//!
//! ```rust,no_run
//! use warden_audit::{JsonlOutcomeStore, OutcomeRecord, OutcomeStore};
//!
//! let store = JsonlOutcomeStore::open("/tmp/outcomes.jsonl").unwrap();
//! let record = OutcomeRecord::new("knowledge_search", "query", "metrics_write")
//!     .with_input("what changed in the parser?")
//!     .with_output("Two commits touched it last week.")
//!     .with_result(true, 1.0, 42);
//! store.record(record).unwrap();
//! ```

pub mod error;
pub mod hasher;
pub mod log;
pub mod record;
pub mod store;

pub use error::AuditError;
pub use log::OutcomeLog;
pub use record::{excerpt, OutcomeRecord, EXCERPT_LIMIT};
pub use store::{JsonlOutcomeStore, OutcomeStore};
