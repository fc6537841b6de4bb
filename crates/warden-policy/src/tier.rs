// tier.rs — Graduated autonomy tiers and the resolution table.
//
// resolve_tier() is a pure function of (category, authority, target files,
// message verbs, backend availability). It never looks at mutable state.
//
//   not authorized                         → Advisory
//   authorized + read-only category        → MetricsWrite
//   authorized + Schedule                  → MetricsWrite
//   authorized + mutating, no backend      → Advisory   (fail closed)
//   authorized + mutating, source signal   → Source
//   authorized + mutating, otherwise       → DocsTests
//
// "Source signal" = (named source files AND a modification verb) OR
// (a modification verb AND a source-referring noun).

use serde::{Deserialize, Serialize};
use warden_intent::IntentCategory;

/// How much the router may change on a principal's behalf.
///
/// Variants are declared in increasing order of privilege, so the derived
/// `Ord` gives `Advisory < MetricsWrite < DocsTests < Source`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyTier {
    /// Read-only. Nothing is mutated.
    Advisory,
    /// May record metrics, reminders and other bookkeeping.
    MetricsWrite,
    /// May change documentation and tests.
    DocsTests,
    /// May modify persisted source artifacts.
    Source,
}

impl AutonomyTier {
    pub fn as_str(self) -> &'static str {
        match self {
            AutonomyTier::Advisory => "advisory",
            AutonomyTier::MetricsWrite => "metrics_write",
            AutonomyTier::DocsTests => "docs_tests",
            AutonomyTier::Source => "source",
        }
    }

    /// Whether this tier grants anything beyond read-only access.
    pub fn is_elevated(self) -> bool {
        self > AutonomyTier::Advisory
    }
}

impl std::fmt::Display for AutonomyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything tier resolution is allowed to look at.
#[derive(Debug, Clone, Copy)]
pub struct TierInputs<'a> {
    pub category: IntentCategory,
    pub is_authorized_principal: bool,
    pub message: &'a str,
    pub target_files: &'a [String],
    pub permission_backend_available: bool,
}

const MODIFICATION_VERBS: &[&str] = &[
    "edit", "modify", "refactor", "delete", "rename", "rewrite", "change", "update", "patch",
    "remove", "replace", "implement", "fix",
];

const SOURCE_NOUNS: &[&str] = &[
    "module", "modules", "class", "classes", "function", "functions", "method", "methods",
    "implementation", "struct", "trait", "codebase", "source",
];

/// Resolve the autonomy tier for a request.
pub fn resolve_tier(inputs: &TierInputs<'_>) -> AutonomyTier {
    if !inputs.is_authorized_principal {
        return AutonomyTier::Advisory;
    }

    let category = inputs.category;
    if category.is_read_only() || category.is_time_bound() {
        return AutonomyTier::MetricsWrite;
    }

    // Mutating categories from here on.
    if !inputs.permission_backend_available {
        return AutonomyTier::Advisory;
    }

    if has_source_signal(inputs.message, inputs.target_files) {
        AutonomyTier::Source
    } else {
        AutonomyTier::DocsTests
    }
}

fn has_source_signal(message: &str, target_files: &[String]) -> bool {
    let words = lowercase_words(message);
    let has_verb = words.iter().any(|w| MODIFICATION_VERBS.contains(&w.as_str()));
    if !has_verb {
        return false;
    }
    let has_noun = words.iter().any(|w| SOURCE_NOUNS.contains(&w.as_str()));
    !target_files.is_empty() || has_noun
}

fn lowercase_words(message: &str) -> Vec<String> {
    message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
