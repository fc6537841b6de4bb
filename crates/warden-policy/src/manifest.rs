// manifest.rs — Local allow/deny permission backend.
//
// ManifestPolicy is the default PermissionBackend. Each agent gets a
// PermissionManifest of glob grants plus deny patterns. Evaluation:
//
// 1. Target path contains traversal? → Deny
// 2. Does the agent have a manifest? → No → Deny
// 3. Is the manifest expired? → Yes → Deny
// 4. Does any deny pattern match? → Yes → Deny (deny wins)
// 5. Does a grant for the operation match the path? → Yes → Allow
// 6. No match → Deny
//
// A general (path-less) request is allowed only when the agent holds an
// unrestricted "**" grant for the operation and has no deny patterns.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PolicyError;
use crate::permission::{PermissionBackend, PermissionDecision, PermissionVerdict};

const UNRESTRICTED: &str = "**";

/// One allowed (operation, path glob) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionGrant {
    /// Operation name, e.g. "write".
    pub operation: String,
    /// Glob over workspace-relative paths, e.g. "modules/**".
    pub resource_pattern: String,
}

/// The complete set of permissions for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionManifest {
    #[serde(default = "Uuid::new_v4")]
    pub manifest_id: Uuid,
    pub agent_id: String,
    #[serde(default)]
    pub grants: Vec<PermissionGrant>,
    /// Path globs that are refused for every operation.
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    /// Hard cutoff. Absent means no expiry.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl PermissionManifest {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            manifest_id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            grants: Vec::new(),
            deny: Vec::new(),
            issued_at: Some(Utc::now()),
            expires_at: None,
        }
    }

    /// Allow `operation` on paths matching the glob `resource_pattern`.
    pub fn grant(mut self, operation: &str, resource_pattern: &str) -> Self {
        self.grants.push(PermissionGrant {
            operation: operation.to_string(),
            resource_pattern: resource_pattern.to_string(),
        });
        self
    }

    /// Deny any path matching `pattern`. Deny wins over every grant.
    pub fn deny(mut self, pattern: &str) -> Self {
        self.deny.push(pattern.to_string());
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }
}

/// A request submitted to [`ManifestPolicy::evaluate`].
#[derive(Debug, Clone)]
pub struct PermissionRequest {
    pub agent_id: String,
    pub operation: String,
    /// `None` asks the general question for the operation.
    pub path: Option<String>,
}

impl PermissionRequest {
    pub fn new(agent_id: &str, operation: &str, path: Option<&str>) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            operation: operation.to_string(),
            path: path.map(String::from),
        }
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("{} on '{}'", self.operation, path),
            None => format!("{} (general)", self.operation),
        }
    }
}

/// One check performed during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationStep {
    pub check: String,
    pub outcome: String,
    pub terminal: bool,
}

/// A decision together with every step that led to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub decision: PermissionDecision,
    pub steps: Vec<EvaluationStep>,
    pub matching_grant: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    manifests: Vec<PermissionManifest>,
}

/// Manifest-backed permission backend. Denies everything by default.
#[derive(Debug, Default)]
pub struct ManifestPolicy {
    manifests: HashMap<String, PermissionManifest>,
}

impl ManifestPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites any existing manifest for the same agent.
    pub fn load_manifest(&mut self, manifest: PermissionManifest) {
        self.manifests.insert(manifest.agent_id.clone(), manifest);
    }

    /// Parse a policy document of the form `manifests: [ ... ]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        let file: PolicyFile = serde_yaml::from_str(yaml)?;
        let mut policy = Self::new();
        for manifest in file.manifests {
            policy.load_manifest(manifest);
        }
        Ok(policy)
    }

    /// Load manifests from a YAML policy file.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| PolicyError::PolicyFile {
            path: path.to_path_buf(),
            source,
        })?;
        let policy = Self::from_yaml_str(&yaml)?;
        tracing::info!(
            path = %path.display(),
            agents = policy.manifests.len(),
            "loaded permission manifests"
        );
        Ok(policy)
    }

    pub fn agent_count(&self) -> usize {
        self.manifests.len()
    }

    /// Evaluate a request. See [`ManifestPolicy::evaluate_with_trace`].
    pub fn evaluate(&self, request: &PermissionRequest) -> PermissionDecision {
        self.evaluate_with_trace(request).decision
    }

    /// Same logic as [`evaluate`](Self::evaluate), recording every step.
    pub fn evaluate_with_trace(&self, request: &PermissionRequest) -> EvaluationTrace {
        let mut trace = TraceBuilder::default();

        // Step 1: path traversal
        if let Some(path) = request.path.as_deref() {
            if contains_path_traversal(path) {
                return trace.deny(
                    "path_traversal",
                    format!("path traversal detected in target path: '{path}'"),
                );
            }
        }
        trace.pass("path_traversal", "passed".to_string());

        // Step 2: manifest lookup
        let Some(manifest) = self.manifests.get(&request.agent_id) else {
            return trace.deny(
                "manifest_lookup",
                format!("no permission manifest for agent '{}'", request.agent_id),
            );
        };
        trace.pass(
            "manifest_lookup",
            format!(
                "found: {} grants, {} deny patterns",
                manifest.grants.len(),
                manifest.deny.len()
            ),
        );

        // Step 3: expiry
        if manifest.is_expired() {
            return trace.deny(
                "manifest_expiry",
                format!("permission manifest for agent '{}' has expired", request.agent_id),
            );
        }
        trace.pass("manifest_expiry", "passed".to_string());

        match request.path.as_deref() {
            Some(path) => {
                // Step 4: deny patterns
                if let Some(pattern) = manifest
                    .deny
                    .iter()
                    .find(|pattern| matches_resource_pattern(pattern, path))
                {
                    return trace.deny(
                        "deny_patterns",
                        format!("path '{path}' matches deny pattern '{pattern}'"),
                    );
                }
                trace.pass("deny_patterns", "no deny pattern matched".to_string());

                // Step 5: grant matching
                let grant = manifest.grants.iter().find(|grant| {
                    grant.operation == request.operation
                        && matches_resource_pattern(&grant.resource_pattern, path)
                });
                match grant {
                    Some(grant) => trace.allow(grant),
                    None => trace.deny(
                        "grant_match",
                        format!("no grant for {}", request.describe()),
                    ),
                }
            }
            None => {
                if !manifest.deny.is_empty() {
                    return trace.deny(
                        "general_check",
                        format!(
                            "general {} refused: agent '{}' has deny patterns",
                            request.operation, request.agent_id
                        ),
                    );
                }
                let grant = manifest.grants.iter().find(|grant| {
                    grant.operation == request.operation && grant.resource_pattern == UNRESTRICTED
                });
                match grant {
                    Some(grant) => trace.allow(grant),
                    None => trace.deny(
                        "general_check",
                        format!("no unrestricted grant for {}", request.describe()),
                    ),
                }
            }
        }
    }
}

impl PermissionBackend for ManifestPolicy {
    fn check_permission(
        &self,
        agent_id: &str,
        operation: &str,
        path: Option<&str>,
    ) -> Result<PermissionVerdict, PolicyError> {
        let request = PermissionRequest::new(agent_id, operation, path);
        Ok(match self.evaluate(&request) {
            PermissionDecision::Allowed => PermissionVerdict::allow("granted by manifest"),
            PermissionDecision::Denied { reason } | PermissionDecision::Error { reason } => {
                PermissionVerdict::deny(reason)
            }
        })
    }
}

#[derive(Default)]
struct TraceBuilder {
    steps: Vec<EvaluationStep>,
}

impl TraceBuilder {
    fn pass(&mut self, check: &str, outcome: String) {
        self.steps.push(EvaluationStep {
            check: check.to_string(),
            outcome,
            terminal: false,
        });
    }

    fn deny(mut self, check: &str, reason: String) -> EvaluationTrace {
        self.steps.push(EvaluationStep {
            check: check.to_string(),
            outcome: format!("denied: {reason}"),
            terminal: true,
        });
        EvaluationTrace {
            decision: PermissionDecision::Denied { reason },
            steps: self.steps,
            matching_grant: None,
        }
    }

    fn allow(mut self, grant: &PermissionGrant) -> EvaluationTrace {
        let desc = format!("{} on '{}'", grant.operation, grant.resource_pattern);
        self.steps.push(EvaluationStep {
            check: "grant_match".to_string(),
            outcome: format!("allowed: {desc}"),
            terminal: true,
        });
        EvaluationTrace {
            decision: PermissionDecision::Allowed,
            steps: self.steps,
            matching_grant: Some(desc),
        }
    }
}

/// Invalid patterns never match (fail-closed).
fn matches_resource_pattern(pattern: &str, target: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(p) => p.matches(target),
        Err(_) => false,
    }
}

fn contains_path_traversal(path: &str) -> bool {
    path.contains("..") || path.contains("%2e%2e") || path.contains("%2E%2E")
}
