//! # warden-daemon
//!
//! HTTP transport for the Warden intent router.
//!
//! ## Endpoints
//!
//! - `POST /hooks/agent`: body `{message, sessionKey, channel, sender,
//!   metadata}`, header `Authorization: Bearer <token>`; replies
//!   `{text, deliver, channel, to}`.
//! - `GET /health`: liveness.
//!
//! The shared secret comes from `WARDEN_HOOK_TOKEN`. When it is unset a
//! random token is generated at startup and printed once to stdout; logs
//! only carry its prefix.

pub mod http;
pub mod logging;

pub use http::{
    app, generate_token, resolve_token, serve, token_prefix, AppState, HookReply, HookRequest,
};
pub use logging::init_tracing;
