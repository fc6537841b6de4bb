// gate.rs — Enforce a resolved autonomy tier.
//
// check_gate(intent, tier):
//   Advisory                    → pass
//   elevated, not authorized    → deny (UnauthorizedPrincipal)
//   Source                      → check_source_permission() must allow
//   otherwise                   → pass
//
// Denials carry an `alert` flag that is false when an identical
// (sender, tier, reason) denial was alerted within the dedupe window.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warden_intent::Intent;

use crate::dedupe::DenialDedupe;
use crate::permission::{check_source_permission, PermissionBackend};
use crate::tier::AutonomyTier;

/// Why the gate refused an elevated tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    UnauthorizedPrincipal,
    SourcePermissionDenied,
    PermissionBackendUnavailable,
}

/// Result of [`PermissionGate::check_gate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Pass,
    Denied {
        kind: DenialKind,
        reason: String,
        /// The refused file, for path-specific denials.
        path: Option<String>,
        /// Whether observers should be alerted (dedupe window elapsed).
        alert: bool,
    },
}

impl GateOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateOutcome::Pass)
    }
}

/// Tier enforcement against an optional permission backend.
pub struct PermissionGate {
    backend: Option<Arc<dyn PermissionBackend>>,
    agent_id: String,
    dedupe: DenialDedupe,
}

impl PermissionGate {
    pub fn new(
        backend: Option<Arc<dyn PermissionBackend>>,
        agent_id: impl Into<String>,
        dedupe: DenialDedupe,
    ) -> Self {
        Self {
            backend,
            agent_id: agent_id.into(),
            dedupe,
        }
    }

    pub fn backend_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&dyn PermissionBackend> {
        self.backend.as_deref()
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Enforce `tier` for `intent`.
    ///
    /// Advisory always passes. Anything higher needs an authorized principal;
    /// `Source` also needs every target path (or the general write check)
    /// explicitly allowed by the permission backend.
    pub fn check_gate(&self, intent: &Intent, tier: AutonomyTier) -> GateOutcome {
        if tier == AutonomyTier::Advisory {
            return GateOutcome::Pass;
        }

        if !intent.is_authorized_principal() {
            return self.deny(
                intent,
                tier,
                DenialKind::UnauthorizedPrincipal,
                format!("sender is not authorized for the {tier} tier"),
                None,
            );
        }

        if tier != AutonomyTier::Source {
            return GateOutcome::Pass;
        }

        let permission =
            check_source_permission(self.backend(), &self.agent_id, intent.raw_message());
        if permission.allowed {
            tracing::debug!(
                sender = intent.sender(),
                paths = ?permission.checked_paths,
                "source permission granted"
            );
            return GateOutcome::Pass;
        }

        let kind = if self.backend.is_none() {
            DenialKind::PermissionBackendUnavailable
        } else {
            DenialKind::SourcePermissionDenied
        };
        self.deny(intent, tier, kind, permission.reason, permission.denied_path)
    }

    fn deny(
        &self,
        intent: &Intent,
        tier: AutonomyTier,
        kind: DenialKind,
        reason: String,
        path: Option<String>,
    ) -> GateOutcome {
        let alert = self.dedupe.should_emit(intent.sender(), tier, &reason);
        tracing::warn!(
            tag = "PERMISSION_DENIED",
            sender = intent.sender(),
            channel = intent.channel(),
            tier = %tier,
            ?kind,
            path = path.as_deref().unwrap_or(""),
            reason = %reason,
            alert,
            "permission gate denied request"
        );
        GateOutcome::Denied {
            kind,
            reason,
            path,
            alert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;
    use crate::manifest::{ManifestPolicy, PermissionManifest};
    use crate::permission::PermissionVerdict;
    use warden_intent::IntentCategory;

    fn intent(message: &str, authorized: bool) -> Intent {
        Intent::new(message, IntentCategory::Command, 0.9, "owner", "webhook", authorized)
    }

    fn gate_with(policy: ManifestPolicy) -> PermissionGate {
        PermissionGate::new(Some(Arc::new(policy)), "router", DenialDedupe::default())
    }

    #[test]
    fn advisory_always_passes() {
        let gate = PermissionGate::new(None, "router", DenialDedupe::default());
        assert!(gate.check_gate(&intent("anything", false), AutonomyTier::Advisory).is_pass());
    }

    #[test]
    fn elevated_tier_requires_authorization() {
        let gate = gate_with(ManifestPolicy::new());
        match gate.check_gate(&intent("run tests", false), AutonomyTier::DocsTests) {
            GateOutcome::Denied { kind, alert, .. } => {
                assert_eq!(kind, DenialKind::UnauthorizedPrincipal);
                assert!(alert);
            }
            GateOutcome::Pass => panic!("unauthorized elevation passed"),
        }
    }

    #[test]
    fn docs_tests_for_authorized_passes_without_path_checks() {
        let gate = gate_with(ManifestPolicy::new());
        assert!(gate.check_gate(&intent("run tests", true), AutonomyTier::DocsTests).is_pass());
    }

    #[test]
    fn source_with_allowed_path_passes() {
        let gate = gate_with({
            let mut p = ManifestPolicy::new();
            p.load_manifest(PermissionManifest::new("router").grant("write", "modules/**"));
            p
        });
        let outcome = gate.check_gate(
            &intent("Edit modules/foo/src/bar.py to fix the crash", true),
            AutonomyTier::Source,
        );
        assert!(outcome.is_pass());
    }

    #[test]
    fn source_with_denied_path_names_the_path() {
        let gate = gate_with({
            let mut p = ManifestPolicy::new();
            p.load_manifest(
                PermissionManifest::new("router")
                    .grant("write", "**")
                    .deny("modules/foo/**"),
            );
            p
        });
        match gate.check_gate(
            &intent("Edit modules/foo/src/bar.py to fix the crash", true),
            AutonomyTier::Source,
        ) {
            GateOutcome::Denied { kind, path, reason, .. } => {
                assert_eq!(kind, DenialKind::SourcePermissionDenied);
                assert_eq!(path.as_deref(), Some("modules/foo/src/bar.py"));
                assert!(reason.contains("deny pattern"));
            }
            GateOutcome::Pass => panic!("denied path passed"),
        }
    }

    #[test]
    fn source_without_backend_fails_closed() {
        let gate = PermissionGate::new(None, "router", DenialDedupe::default());
        match gate.check_gate(&intent("refactor the module", true), AutonomyTier::Source) {
            GateOutcome::Denied { kind, .. } => {
                assert_eq!(kind, DenialKind::PermissionBackendUnavailable)
            }
            GateOutcome::Pass => panic!("missing backend passed"),
        }
    }

    struct Broken;

    impl PermissionBackend for Broken {
        fn check_permission(
            &self,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> Result<PermissionVerdict, PolicyError> {
            Err(PolicyError::BackendUnavailable("timeout".into()))
        }
    }

    #[test]
    fn repeated_denials_alert_once() {
        let gate = PermissionGate::new(Some(Arc::new(Broken)), "router", DenialDedupe::default());
        let request = intent("edit src/a.rs", true);
        let alerts: Vec<bool> = (0..3)
            .map(|_| match gate.check_gate(&request, AutonomyTier::Source) {
                GateOutcome::Denied { alert, .. } => alert,
                GateOutcome::Pass => panic!("broken backend passed"),
            })
            .collect();
        assert_eq!(alerts, vec![true, false, false]);
    }
}
