// preflight.rs — Authority and backend-availability checks before tiering.
//
//   unauthorized sender + mutating category → demote to Conversation
//   mutating category + no permission backend → note (tier fails closed)
//   mutating category + no execution backend → note (advisory fallback)

use serde::Serialize;

use warden_intent::Intent;

use crate::degradation::Degradation;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PreflightReport {
    /// False when the intent had to be demoted.
    pub passed: bool,
    pub notes: Vec<String>,
    pub degradations: Vec<Degradation>,
}

/// Demote unauthorized mutating intents and note missing backends.
///
/// Runs before tier resolution, so a demoted intent is tiered as
/// conversation.
pub fn preflight(
    intent: &mut Intent,
    permission_backend_available: bool,
    execution_backend_available: bool,
) -> PreflightReport {
    let mut report = PreflightReport {
        passed: true,
        ..PreflightReport::default()
    };

    if !intent.category().is_mutating() {
        return report;
    }

    if !intent.is_authorized_principal() {
        tracing::info!(
            sender = intent.sender(),
            category = %intent.category(),
            "unauthorized sender asked for a mutating action; demoting to conversation"
        );
        intent.demote("unauthorized_principal");
        report.passed = false;
        report
            .notes
            .push("sender is not authorized for mutating actions".to_string());
        return report;
    }

    if !permission_backend_available {
        report
            .notes
            .push("permission backend unavailable; mutating tiers fail closed".to_string());
        report
            .degradations
            .push(Degradation::PermissionBackendUnavailable);
    }
    if !execution_backend_available {
        report
            .notes
            .push("execution backend unavailable; advisory fallback only".to_string());
        report
            .degradations
            .push(Degradation::ExecutionBackendUnavailable);
    }
    report
}
