// permission.rs — The permission-backend seam and fail-closed evaluation.
//
// A backend answers "may agent A perform operation O on path P?". Callers
// never see the backend's Result directly: evaluate_permission() folds it
// into a PermissionDecision where Error is treated exactly like Denied.

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::paths::extract_file_paths;

/// The operation name used for source-tier checks.
pub const WRITE_OPERATION: &str = "write";

/// A backend's raw answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionVerdict {
    pub allowed: bool,
    pub reason: String,
}

impl PermissionVerdict {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Allow/deny policy keyed by agent identity, operation and optional path.
pub trait PermissionBackend: Send + Sync {
    /// `path = None` asks the general question for the operation.
    fn check_permission(
        &self,
        agent_id: &str,
        operation: &str,
        path: Option<&str>,
    ) -> Result<PermissionVerdict, PolicyError>;
}

/// Tagged result of one permission check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PermissionDecision {
    Allowed,
    Denied { reason: String },
    /// The backend was absent or failed. Treated as `Denied` everywhere.
    Error { reason: String },
}

impl PermissionDecision {
    /// True only for a definitive `Allowed`.
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionDecision::Allowed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            PermissionDecision::Allowed => None,
            PermissionDecision::Denied { reason } | PermissionDecision::Error { reason } => {
                Some(reason)
            }
        }
    }
}

/// Run one check against an optional backend.
pub fn evaluate_permission(
    backend: Option<&dyn PermissionBackend>,
    agent_id: &str,
    operation: &str,
    path: Option<&str>,
) -> PermissionDecision {
    let Some(backend) = backend else {
        return PermissionDecision::Error {
            reason: "permission backend unavailable".to_string(),
        };
    };
    match backend.check_permission(agent_id, operation, path) {
        Ok(verdict) if verdict.allowed => PermissionDecision::Allowed,
        Ok(verdict) => PermissionDecision::Denied {
            reason: if verdict.reason.is_empty() {
                "denied by policy".to_string()
            } else {
                verdict.reason
            },
        },
        Err(e) => PermissionDecision::Error {
            reason: format!("permission check failed: {e}"),
        },
    }
}

/// Result of a source-tier permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePermission {
    pub allowed: bool,
    pub reason: String,
    /// The first path that was refused, when the refusal was path-specific.
    pub denied_path: Option<String>,
    /// Paths that were checked, in order.
    pub checked_paths: Vec<String>,
}

/// Check write permission for every file a message names.
///
/// With no named files, falls back to the general write check for the
/// agent. Any single refusal refuses the whole request.
pub fn check_source_permission(
    backend: Option<&dyn PermissionBackend>,
    agent_id: &str,
    message: &str,
) -> SourcePermission {
    let paths = extract_file_paths(message);

    if paths.is_empty() {
        let decision = evaluate_permission(backend, agent_id, WRITE_OPERATION, None);
        return match decision.reason() {
            None => SourcePermission {
                allowed: true,
                reason: "general write permission granted".to_string(),
                denied_path: None,
                checked_paths: paths,
            },
            Some(reason) => SourcePermission {
                allowed: false,
                reason: reason.to_string(),
                denied_path: None,
                checked_paths: paths,
            },
        };
    }

    for path in &paths {
        let decision = evaluate_permission(backend, agent_id, WRITE_OPERATION, Some(path));
        if let Some(reason) = decision.reason() {
            return SourcePermission {
                allowed: false,
                reason: reason.to_string(),
                denied_path: Some(path.clone()),
                checked_paths: paths.clone(),
            };
        }
    }

    SourcePermission {
        allowed: true,
        reason: format!("write permission granted for {} path(s)", paths.len()),
        denied_path: None,
        checked_paths: paths,
    }
}
