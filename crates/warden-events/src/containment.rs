// containment.rs — Operator-declared restrictions on senders and channels.
//
// An entry either restricts (every tier forced to Advisory) or blocks (fixed
// "access restricted" reply) a sender or a whole channel. Entries may carry
// an expiry; expired entries are ignored and pruned on the next lookup.
// When several entries apply, Block beats Restrict.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// What an active containment does to matching requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentAction {
    Restrict,
    Block,
}

impl ContainmentAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainmentAction::Restrict => "restrict",
            ContainmentAction::Block => "block",
        }
    }
}

/// Who a containment applies to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ContainmentTarget {
    Sender(String),
    Channel(String),
}

impl ContainmentTarget {
    fn applies_to(&self, sender: &str, channel: &str) -> bool {
        match self {
            ContainmentTarget::Sender(s) => s == sender,
            ContainmentTarget::Channel(c) => c.eq_ignore_ascii_case(channel),
        }
    }
}

/// The answer to "is this sender or channel contained?".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Containment {
    pub target: ContainmentTarget,
    pub action: ContainmentAction,
    pub reason: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Containment {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Operator-declared containments. Expired entries are ignored and pruned.
#[derive(Debug, Default)]
pub struct ContainmentRegistry {
    entries: Mutex<Vec<Containment>>,
}

impl ContainmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of [`Containment`] entries.
    pub fn from_file(path: &Path) -> Result<Self, EventError> {
        let json = std::fs::read_to_string(path).map_err(|source| EventError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<Containment> = serde_json::from_str(&json)?;
        tracing::info!(path = %path.display(), entries = entries.len(), "loaded containment entries");
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Containment>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Add or replace the entry for `target`.
    pub fn declare(
        &self,
        target: ContainmentTarget,
        action: ContainmentAction,
        reason: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        let mut entries = self.lock();
        entries.retain(|e| e.target != target);
        entries.push(Containment {
            target,
            action,
            reason: reason.into(),
            expires_at,
        });
    }

    /// Remove the entry for `target`. Returns whether one existed.
    pub fn lift(&self, target: &ContainmentTarget) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|e| &e.target != target);
        entries.len() != before
    }

    /// The strongest active containment for this sender or channel.
    pub fn check(&self, sender: &str, channel: &str) -> Option<Containment> {
        self.check_at(sender, channel, Utc::now())
    }

    pub fn check_at(&self, sender: &str, channel: &str, now: DateTime<Utc>) -> Option<Containment> {
        let mut entries = self.lock();
        entries.retain(|e| !e.is_expired_at(now));
        entries
            .iter()
            .filter(|e| e.target.applies_to(sender, channel))
            .max_by_key(|e| e.action)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
