// category.rs — Intent categories and their routing properties.

use serde::{Deserialize, Serialize};

/// What kind of request a message is.
///
/// The category decides which autonomy rules apply: read-only categories
/// never mutate anything, mutating categories need an authorized principal
/// and a passing permission gate, and `Schedule` is time-bound bookkeeping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// A read-only question answered from search.
    Query,
    /// A request to change or run something.
    Command,
    /// A request for status, health, or metrics.
    Monitor,
    /// Free-form chat. The safest category.
    Conversation,
    /// Social/audience interaction (posts, replies, followers).
    Social,
    /// A time-bound request (reminders, recurring jobs).
    Schedule,
    /// Host or service administration.
    System,
}

impl IntentCategory {
    /// Every category, in scoring order.
    pub const ALL: [IntentCategory; 7] = [
        IntentCategory::Query,
        IntentCategory::Command,
        IntentCategory::Monitor,
        IntentCategory::Conversation,
        IntentCategory::Social,
        IntentCategory::Schedule,
        IntentCategory::System,
    ];

    /// Categories that may mutate state if permitted.
    pub fn is_mutating(self) -> bool {
        matches!(self, IntentCategory::Command | IntentCategory::System)
    }

    /// Categories that only ever read.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            IntentCategory::Query
                | IntentCategory::Monitor
                | IntentCategory::Conversation
                | IntentCategory::Social
        )
    }

    /// Categories bound to a future point in time.
    pub fn is_time_bound(self) -> bool {
        matches!(self, IntentCategory::Schedule)
    }

    /// The handler route this category dispatches to.
    pub fn route(self) -> &'static str {
        match self {
            IntentCategory::Query => "knowledge_search",
            IntentCategory::Command => "command_execution",
            IntentCategory::Monitor => "status_monitor",
            IntentCategory::Conversation => "conversation",
            IntentCategory::Social => "social_engagement",
            IntentCategory::Schedule => "scheduler",
            IntentCategory::System => "system_admin",
        }
    }

    /// Stable snake_case name, used in prompts, logs and task payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            IntentCategory::Query => "query",
            IntentCategory::Command => "command",
            IntentCategory::Monitor => "monitor",
            IntentCategory::Conversation => "conversation",
            IntentCategory::Social => "social",
            IntentCategory::Schedule => "schedule",
            IntentCategory::System => "system",
        }
    }

    /// A one-line description handed to the external validator.
    pub fn describe(self) -> &'static str {
        match self {
            IntentCategory::Query => "a question asking for information or an explanation",
            IntentCategory::Command => "an instruction to run, change, create or delete something",
            IntentCategory::Monitor => "a request for system status, health, logs or metrics",
            IntentCategory::Conversation => "casual conversation or small talk",
            IntentCategory::Social => "a request about social media posts, replies or followers",
            IntentCategory::Schedule => "a request to schedule or be reminded of something later",
            IntentCategory::System => "a request to administer services, configuration or the host",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
