//! # warden-intent
//!
//! Turns an inbound natural-language message into a typed [`Intent`].
//!
//! Classification is two-stage: a fast lexical pre-filter scores every
//! [`IntentCategory`] by keyword hits, and an optional external
//! [`BinaryValidator`] answers YES/NO for the top candidates. Any failure of
//! the external stage degrades to the keyword-only result; it never
//! propagates.
//!
//! ## Key invariants
//!
//! - **Safe default**: no keyword hits → `Conversation` at confidence 0.5.
//! - **Authority is fixed**: `Intent::is_authorized_principal` is computed
//!   once from the sender and has no setter.
//! - **Demotion only**: an intent's category can be lowered to
//!   `Conversation`, never raised.

pub mod category;
pub mod classifier;
pub mod error;
pub mod intent;
pub mod lexical;
pub mod ollama;
pub mod validator;

pub use category::IntentCategory;
pub use classifier::{ClassificationMethod, ClassifierSettings, IntentClassifier};
pub use error::IntentError;
pub use intent::{Intent, Principals};
pub use lexical::{LexicalClassifier, LexicalScore};
pub use ollama::OllamaValidator;
pub use validator::{parse_verdict, BinaryValidator, ClassifierStrategy, HybridStrategy, KeywordOnly};
