//! # warden-router
//!
//! The policy-gated intent router.
//!
//! [`Router::process`] takes one inbound message from an untrusted remote
//! principal and returns reply text. On the way it:
//!
//! 1. Throttles the sender and channel (token buckets).
//! 2. Deflects secret-seeking and code-mutation attempts, escalating
//!    repeat secret requests to a traceable fake credential.
//! 3. Classifies the message into an [`warden_intent::Intent`].
//! 4. Applies operator containment (restrict or block).
//! 5. Demotes unauthorized mutating requests, resolves the
//!    [`warden_policy::AutonomyTier`], and enforces it with fail-closed
//!    permission checks.
//! 6. Requires a passing skill safety scan before any mutating route.
//! 7. Plans, dispatches to the execution backend (or a deterministic
//!    advisory fallback), scrubs secret-shaped output and records the
//!    outcome.
//!
//! `process` never fails: every collaborator error becomes safe text and a
//! [`Degradation`] in the request log.
//!
//! ```rust,no_run
//! use warden_router::{Router, RouterConfig};
//!
//! # async fn demo() -> Result<(), warden_router::RouterError> {
//! let config = RouterConfig::for_project(std::path::Path::new("."))?;
//! let router = Router::from_config(config)?;
//! let reply = router
//!     .process("what's the status of the build?", "alice", "webhook", "s-1", Default::default())
//!     .await;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod degradation;
pub mod error;
pub mod executor;
pub mod plan;
pub mod preflight;
pub mod router;
pub mod validate;

pub use backend::{
    ExecutionBackend, ExecutionTask, HttpExecutionBackend, SearchBackend, SearchHit, SearchResults,
};
pub use config::RouterConfig;
pub use degradation::Degradation;
pub use error::RouterError;
pub use executor::{ExecutionOutput, Executor, DEMOTED_REPLY};
pub use plan::{ExecutionPlan, StepSpec};
pub use preflight::PreflightReport;
pub use router::{Router, RouterBuilder, ACCESS_RESTRICTED, SKILL_SCAN_BLOCKED, TEMPORARILY_UNAVAILABLE};
pub use validate::{ExecutionResult, OutputValidator, EMPTY_RESPONSE, REDACTED_RESPONSE};
