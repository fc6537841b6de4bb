// monitor.rs — The security-event / containment seam used by the router.

use crate::containment::{Containment, ContainmentRegistry};
use crate::event::SecurityEvent;
use crate::sink::EventDispatcher;

/// Receives security events and answers containment lookups.
pub trait SecurityMonitor: Send + Sync {
    fn ingest_event(&self, event: SecurityEvent);

    fn check_containment(&self, sender: &str, channel: &str) -> Option<Containment>;
}

/// In-process monitor: dispatches events to sinks and consults a local
/// containment registry.
#[derive(Default)]
pub struct LocalSecurityMonitor {
    dispatcher: EventDispatcher,
    containment: ContainmentRegistry,
}

impl LocalSecurityMonitor {
    pub fn new(dispatcher: EventDispatcher, containment: ContainmentRegistry) -> Self {
        Self {
            dispatcher,
            containment,
        }
    }

    pub fn containment(&self) -> &ContainmentRegistry {
        &self.containment
    }
}

impl SecurityMonitor for LocalSecurityMonitor {
    fn ingest_event(&self, event: SecurityEvent) {
        tracing::debug!(
            event_type = event.event_type(),
            sender = %event.sender,
            channel = %event.channel,
            "security event"
        );
        self.dispatcher.dispatch(&event);
    }

    fn check_containment(&self, sender: &str, channel: &str) -> Option<Containment> {
        self.containment.check(sender, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containment::{ContainmentAction, ContainmentTarget};
    use crate::sink::LogSink;

    #[test]
    fn ingests_to_sinks_and_answers_containment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security.jsonl");
        let monitor = LocalSecurityMonitor::new(
            EventDispatcher::new().with_sink(Box::new(LogSink::new(&path))),
            ContainmentRegistry::new(),
        );

        monitor.ingest_event(SecurityEvent::rate_limited("bob", "sms", "sender", "too fast"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("rate_limited"));

        assert!(monitor.check_containment("bob", "sms").is_none());
        monitor.containment().declare(
            ContainmentTarget::Sender("bob".into()),
            ContainmentAction::Restrict,
            "rate abuse",
            None,
        );
        assert_eq!(
            monitor.check_containment("bob", "sms").unwrap().action,
            ContainmentAction::Restrict
        );
    }
}
