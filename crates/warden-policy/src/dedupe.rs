// dedupe.rs — Suppress repeated permission-denied alerts.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::tier::AutonomyTier;

type DedupeKey = (String, AutonomyTier, String);

/// Remembers when each `(sender, tier, reason)` denial was last alerted.
#[derive(Debug)]
pub struct DenialDedupe {
    window: Duration,
    last_emitted: Mutex<HashMap<DedupeKey, Instant>>,
}

impl DenialDedupe {
    /// A dedupe that suppresses repeats of the same denial for `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emitted: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns true if an alert for this triple should be emitted now.
    pub fn should_emit(&self, sender: &str, tier: AutonomyTier, reason: &str) -> bool {
        self.should_emit_at(sender, tier, reason, Instant::now())
    }

    /// [`DenialDedupe::should_emit`] against an explicit clock.
    ///
    /// Entries older than the window are dropped on every call.
    pub fn should_emit_at(
        &self,
        sender: &str,
        tier: AutonomyTier,
        reason: &str,
        now: Instant,
    ) -> bool {
        let mut map = match self.last_emitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Compact expired entries so the map stays bounded.
        let window = self.window;
        map.retain(|_, at| now.saturating_duration_since(*at) < window);

        let key = (sender.to_string(), tier, reason.to_string());
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, now);
        true
    }

    /// Number of denials currently inside the window.
    pub fn len(&self) -> usize {
        self.last_emitted.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DenialDedupe {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_triple_is_suppressed_within_window() {
        let dedupe = DenialDedupe::default();
        let t0 = Instant::now();
        assert!(dedupe.should_emit_at("bob", AutonomyTier::Source, "denied", t0));
        assert!(!dedupe.should_emit_at(
            "bob",
            AutonomyTier::Source,
            "denied",
            t0 + Duration::from_secs(30)
        ));
    }

    #[test]
    fn different_reason_or_tier_is_not_suppressed() {
        let dedupe = DenialDedupe::default();
        let t0 = Instant::now();
        assert!(dedupe.should_emit_at("bob", AutonomyTier::Source, "a", t0));
        assert!(dedupe.should_emit_at("bob", AutonomyTier::Source, "b", t0));
        assert!(dedupe.should_emit_at("bob", AutonomyTier::DocsTests, "a", t0));
        assert!(dedupe.should_emit_at("eve", AutonomyTier::Source, "a", t0));
    }

    #[test]
    fn emits_again_after_window_and_compacts() {
        let dedupe = DenialDedupe::new(Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(dedupe.should_emit_at("bob", AutonomyTier::Source, "a", t0));
        assert!(dedupe.should_emit_at("eve", AutonomyTier::Source, "a", t0));
        assert_eq!(dedupe.len(), 2);

        let later = t0 + Duration::from_secs(61);
        assert!(dedupe.should_emit_at("bob", AutonomyTier::Source, "a", later));
        assert_eq!(dedupe.len(), 1);
    }
}
