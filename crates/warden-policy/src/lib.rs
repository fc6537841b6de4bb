//! # warden-policy
//!
//! Graduated autonomy and fail-closed permission checks for Warden.
//!
//! An [`Intent`](warden_intent::Intent) is mapped to an [`AutonomyTier`] by a
//! pure function of its category, the sender's authority, the files it
//! names, and whether a permission backend exists. The [`PermissionGate`]
//! then enforces that tier; the `Source` tier additionally requires every
//! named file to be explicitly allowed by a [`PermissionBackend`].
//!
//! ## Key invariants
//!
//! - **Untrusted means advisory**: a non-authorized principal always
//!   resolves to `Advisory`.
//! - **Fail closed**: no backend, a backend error, or anything short of a
//!   definitive "allowed" is a denial.
//! - **Deny wins**: in a [`ManifestPolicy`], a matching deny pattern beats
//!   any grant.
//! - **Path traversal blocked**: paths containing ".." are always denied.

pub mod dedupe;
pub mod error;
pub mod gate;
pub mod manifest;
pub mod paths;
pub mod permission;
pub mod tier;

pub use dedupe::DenialDedupe;
pub use error::PolicyError;
pub use gate::{DenialKind, GateOutcome, PermissionGate};
pub use manifest::{
    EvaluationStep, EvaluationTrace, ManifestPolicy, PermissionGrant, PermissionManifest,
    PermissionRequest,
};
pub use paths::extract_file_paths;
pub use permission::{
    check_source_permission, evaluate_permission, PermissionBackend, PermissionDecision,
    PermissionVerdict, SourcePermission, WRITE_OPERATION,
};
pub use tier::{resolve_tier, AutonomyTier, TierInputs};
