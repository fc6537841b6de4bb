//! # warden-events
//!
//! Security events emitted by the router, the sinks that observe them, and
//! operator-declared containment.
//!
//! Sinks observe; they never influence a decision. A failing sink is logged
//! and skipped. Containment is the one input flowing the other way: an
//! operator can restrict (force `Advisory`) or block a sender or channel
//! until an expiry time.

pub mod containment;
pub mod error;
pub mod event;
pub mod monitor;
pub mod sink;

pub use containment::{Containment, ContainmentAction, ContainmentRegistry, ContainmentTarget};
pub use error::EventError;
pub use event::{SecurityEvent, SecurityEventKind};
pub use monitor::{LocalSecurityMonitor, SecurityMonitor};
pub use sink::{EventDispatcher, LogSink, NotificationSink};
