// degradation.rs — Recoverable failure conditions recorded per request.
//
// None of these are errors from the caller's point of view: each one is
// converted to a safe text response where it happens and then recorded in
// the intent metadata and the request's completion log line.

use serde::{Deserialize, Serialize};

/// Why a request was answered with less than it asked for.
///
/// Degradations never surface as errors; they are attached to the
/// request log line and the reply text stays safe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// The external classifier was skipped; keyword-only result used.
    ClassificationDegraded,
    /// No permission backend, or it failed. Mutating tiers fail closed.
    PermissionBackendUnavailable,
    /// A named file was refused by the permission backend.
    SourcePermissionDenied,
    ExecutionBackendUnavailable,
    ExecutionBackendError,
    /// The skill scanner was missing, crashed, or timed out.
    ScannerUnavailable,
    /// The skill scan found blocking issues.
    SkillScanBlocked,
    RateLimited,
    /// Secret-shaped output was replaced with a redaction notice.
    SecretLeakDetected,
    ContainmentActive,
    RequestTimedOut,
}

impl Degradation {
    pub fn as_str(self) -> &'static str {
        match self {
            Degradation::ClassificationDegraded => "classification_degraded",
            Degradation::PermissionBackendUnavailable => "permission_backend_unavailable",
            Degradation::SourcePermissionDenied => "source_permission_denied",
            Degradation::ExecutionBackendUnavailable => "execution_backend_unavailable",
            Degradation::ExecutionBackendError => "execution_backend_error",
            Degradation::ScannerUnavailable => "scanner_unavailable",
            Degradation::SkillScanBlocked => "skill_scan_blocked",
            Degradation::RateLimited => "rate_limited",
            Degradation::SecretLeakDetected => "secret_leak_detected",
            Degradation::ContainmentActive => "containment_active",
            Degradation::RequestTimedOut => "request_timed_out",
        }
    }
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
