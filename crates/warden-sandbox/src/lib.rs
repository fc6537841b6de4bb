//! # warden-sandbox
//!
//! The skill safety gate: before any mutating route runs, the directory of
//! executable skill definitions must pass an external static-analysis scan.
//!
//! Results are cached for a TTL. Two independent switches decide how
//! failures are treated: `required` (a missing or crashing scanner fails the
//! gate) and `enforced` (a failed gate actually blocks rather than warns).
//! Critical findings always fail the scan regardless of the threshold.

pub mod error;
pub mod gate;
pub mod report;
pub mod scanner;

pub use error::ScanError;
pub use gate::{GateVerdict, SkillSafetyGate, SkillScanPolicy};
pub use report::{ScanReport, Severity};
pub use scanner::{CliSkillScanner, SkillScanner};
