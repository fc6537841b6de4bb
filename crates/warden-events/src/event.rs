// event.rs — Security events emitted by the router.
//
// Every event shares an envelope (id, time, sender, channel) and carries a
// kind-specific payload. Serialized flat, with `event_type` as the tag:
//
//   {"event_id":"…","timestamp":"…","sender":"bob","channel":"sms",
//    "event_type":"rate_limited","scope":"sender","reason":"…"}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened. Serialized with a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SecurityEventKind {
    /// A request was rejected by the rate limiter.
    RateLimited { scope: String, reason: String },

    /// First secret-seeking attempt from a (sender, channel); deflected.
    SecretRequest { attempt: u32 },

    /// A repeat secret-seeking attempt answered with a fake credential.
    HoneypotEmitted {
        attempt: u32,
        provider: String,
        /// Truncated prefix of the fake credential.
        fingerprint: String,
    },

    /// A mutation request on a read-only channel was deflected.
    CodeMutationDeflected,

    /// The permission gate refused an elevated tier.
    PermissionDenied {
        tier: String,
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// The skill safety gate blocked a mutating route.
    SkillScanBlocked { reason: String },

    /// An operator containment was applied to a request.
    ContainmentEnforced { action: String, reason: String },
}

/// A security-relevant observation about one sender on one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub channel: String,
    #[serde(flatten)]
    pub kind: SecurityEventKind,
}

impl SecurityEvent {
    pub fn new(sender: &str, channel: &str, kind: SecurityEventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            sender: sender.to_string(),
            channel: channel.to_string(),
            kind,
        }
    }

    /// Stable snake_case name of the event kind.
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            SecurityEventKind::RateLimited { .. } => "rate_limited",
            SecurityEventKind::SecretRequest { .. } => "secret_request",
            SecurityEventKind::HoneypotEmitted { .. } => "honeypot_emitted",
            SecurityEventKind::CodeMutationDeflected => "code_mutation_deflected",
            SecurityEventKind::PermissionDenied { .. } => "permission_denied",
            SecurityEventKind::SkillScanBlocked { .. } => "skill_scan_blocked",
            SecurityEventKind::ContainmentEnforced { .. } => "containment_enforced",
        }
    }

    pub fn rate_limited(sender: &str, channel: &str, scope: &str, reason: &str) -> Self {
        Self::new(
            sender,
            channel,
            SecurityEventKind::RateLimited {
                scope: scope.to_string(),
                reason: reason.to_string(),
            },
        )
    }

    pub fn permission_denied(
        sender: &str,
        channel: &str,
        tier: &str,
        reason: &str,
        path: Option<&str>,
    ) -> Self {
        Self::new(
            sender,
            channel,
            SecurityEventKind::PermissionDenied {
                tier: tier.to_string(),
                reason: reason.to_string(),
                path: path.map(String::from),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat_with_event_type_tag() {
        let event = SecurityEvent::permission_denied(
            "bob",
            "webhook",
            "source",
            "matches deny pattern",
            Some("config/prod.toml"),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "permission_denied");
        assert_eq!(json["sender"], "bob");
        assert_eq!(json["path"], "config/prod.toml");

        let restored: SecurityEvent = serde_json::from_value(json).unwrap();
        assert_eq!(restored, event);
    }

    #[test]
    fn unit_kind_round_trips() {
        let event = SecurityEvent::new("fan", "discord", SecurityEventKind::CodeMutationDeflected);
        let line = serde_json::to_string(&event).unwrap();
        assert!(line.contains("\"event_type\":\"code_mutation_deflected\""));
        let restored: SecurityEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(restored.event_type(), "code_mutation_deflected");
    }
}
