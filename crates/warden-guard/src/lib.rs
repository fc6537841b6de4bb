//! # warden-guard
//!
//! Boundary defenses that run before a message is classified.
//!
//! - [`RateLimiter`]: one token bucket per sender and one per channel.
//!   A request is admitted only if both buckets have a token.
//! - [`DeceptionDefense`]: detects attempts to extract secrets or to mutate
//!   code from read-only channels. Secret-seeking escalates per
//!   `(sender, channel)` from a natural deflection (phase 1) to a freshly
//!   generated fake credential (phase 2) that is logged for leak tracing.
//! - [`SecretScanner`]: the catalogue of credential shapes, used to scrub
//!   outbound responses.
//!
//! All state is in-process and guarded by one mutex per map.

pub mod deception;
pub mod error;
pub mod honeypot;
pub mod rate_limit;
pub mod secrets;

pub use deception::{DeceptionDefense, DeceptionVerdict, SecretRequestHistory};
pub use error::GuardError;
pub use honeypot::{generate_fake_credential, CredentialProvider};
pub use rate_limit::{LimitScope, RateDecision, RateLimitConfig, RateLimiter, TokenBucket};
pub use secrets::SecretScanner;
