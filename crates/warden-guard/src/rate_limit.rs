// rate_limit.rs — Per-sender and per-channel token buckets.
//
// check(sender, channel):
//   1. Lazily create both buckets (full) and refill them by elapsed time.
//   2. Sender bucket empty  → reject (Sender), nothing deducted.
//   3. Channel bucket empty → reject (Channel), nothing deducted.
//   4. Deduct one token from each and admit.
//
// Both maps live behind one mutex so the refill/check/deduct sequence is a
// single critical section: two concurrent requests can never both spend the
// same token. Idle buckets are swept at most once per sweep interval.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::GuardError;

/// A classic token bucket. `tokens` stays within `[0, capacity]`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_refill: Instant,
    last_used: Instant,
}

impl TokenBucket {
    /// A full bucket refilling at `refill_rate` tokens per second.
    pub fn new(refill_rate: f64, capacity: f64) -> Self {
        Self::new_at(refill_rate, capacity, Instant::now())
    }

    pub fn new_at(refill_rate: f64, capacity: f64, now: Instant) -> Self {
        let capacity = capacity.max(0.0);
        Self {
            tokens: capacity,
            capacity,
            refill_rate: refill_rate.max(0.0),
            last_refill: now,
            last_used: now,
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_at(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).clamp(0.0, self.capacity);
        self.last_refill = now;
    }

    fn has_token(&self) -> bool {
        self.tokens >= 1.0
    }

    fn take(&mut self, now: Instant) {
        self.tokens = (self.tokens - 1.0).max(0.0);
        self.last_used = now;
    }

    /// Refill, then withdraw one token if available.
    pub fn consume_at(&mut self, now: Instant) -> bool {
        self.refill_at(now);
        if self.has_token() {
            self.take(now);
            true
        } else {
            false
        }
    }

    /// Refill to now, then take one token if available.
    pub fn consume(&mut self) -> bool {
        self.consume_at(Instant::now())
    }
}

/// Rates are tokens per second.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub sender_rate: f64,
    pub sender_capacity: f64,
    pub channel_rate: f64,
    pub channel_capacity: f64,
    pub idle: Duration,
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sender_rate: 0.2,
            sender_capacity: 5.0,
            channel_rate: 2.0,
            channel_capacity: 30.0,
            idle: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl RateLimitConfig {
    fn validate(&self) -> Result<(), GuardError> {
        for (field, value) in [
            ("sender_rate", self.sender_rate),
            ("sender_capacity", self.sender_capacity),
            ("channel_rate", self.channel_rate),
            ("channel_capacity", self.channel_capacity),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GuardError::InvalidRateLimit { field, value });
            }
        }
        Ok(())
    }
}

/// Which bucket rejected a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LimitScope {
    Sender,
    Channel,
}

/// Result of [`RateLimiter::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    pub scope: Option<LimitScope>,
}

impl RateDecision {
    fn admit() -> Self {
        Self {
            allowed: true,
            reason: None,
            scope: None,
        }
    }

    fn reject(scope: LimitScope, key: &str) -> Self {
        let reason = match scope {
            LimitScope::Sender => format!("sender rate limit exceeded for '{key}'"),
            LimitScope::Channel => format!("channel rate limit exceeded for '{key}'"),
        };
        Self {
            allowed: false,
            reason: Some(reason),
            scope: Some(scope),
        }
    }
}

#[derive(Debug)]
struct Buckets {
    senders: HashMap<String, TokenBucket>,
    channels: HashMap<String, TokenBucket>,
    last_sweep: Instant,
}

/// Admission control keyed by sender and by channel.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<Buckets>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self, GuardError> {
        config.validate()?;
        Ok(Self {
            config,
            state: Mutex::new(Buckets {
                senders: HashMap::new(),
                channels: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit or reject one request. A rejection deducts nothing.
    pub fn check(&self, sender: &str, channel: &str) -> RateDecision {
        self.check_at(sender, channel, Instant::now())
    }

    pub fn check_at(&self, sender: &str, channel: &str, now: Instant) -> RateDecision {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if now.saturating_duration_since(state.last_sweep) >= self.config.sweep_interval {
            self.sweep(&mut state, now);
        }

        let Buckets {
            senders, channels, ..
        } = &mut *state;

        let sender_bucket = senders.entry(sender.to_string()).or_insert_with(|| {
            TokenBucket::new_at(self.config.sender_rate, self.config.sender_capacity, now)
        });
        sender_bucket.refill_at(now);

        let channel_bucket = channels.entry(channel.to_string()).or_insert_with(|| {
            TokenBucket::new_at(self.config.channel_rate, self.config.channel_capacity, now)
        });
        channel_bucket.refill_at(now);

        let decision = if !sender_bucket.has_token() {
            RateDecision::reject(LimitScope::Sender, sender)
        } else if !channel_bucket.has_token() {
            RateDecision::reject(LimitScope::Channel, channel)
        } else {
            sender_bucket.take(now);
            channel_bucket.take(now);
            return RateDecision::admit();
        };

        tracing::warn!(
            tag = "RATE_LIMITED",
            sender,
            channel,
            scope = ?decision.scope,
            "request rejected by rate limiter"
        );
        decision
    }

    fn sweep(&self, state: &mut Buckets, now: Instant) {
        let idle = self.config.idle;
        let before = state.senders.len() + state.channels.len();
        state
            .senders
            .retain(|_, b| now.saturating_duration_since(b.last_used) < idle);
        state
            .channels
            .retain(|_, b| now.saturating_duration_since(b.last_used) < idle);
        state.last_sweep = now;
        let dropped = before - (state.senders.len() + state.channels.len());
        if dropped > 0 {
            tracing::debug!(dropped, "swept idle rate-limit buckets");
        }
    }

    /// Number of live (sender, channel) buckets.
    pub fn bucket_counts(&self) -> (usize, usize) {
        match self.state.lock() {
            Ok(s) => (s.senders.len(), s.channels.len()),
            Err(poisoned) => {
                let s = poisoned.into_inner();
                (s.senders.len(), s.channels.len())
            }
        }
    }
}
