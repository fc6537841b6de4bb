// secrets.rs — Catalogue of credential shapes.
//
// One combined, leftmost-first alternation so that a single credential is
// counted once even when a shorter shape would match inside it (the
// Anthropic shape is listed before the generic `sk-` shape).

use regex::Regex;

use crate::error::GuardError;

/// Credential shapes, most specific first.
const SECRET_SHAPES: &[&str] = &[
    r"sk-ant-[A-Za-z0-9_\-]{20,}",
    r"sk_live_[A-Za-z0-9]{20,}",
    r"sk-(?:proj-)?[A-Za-z0-9]{20,}",
    r"gh[pousr]_[A-Za-z0-9]{30,}",
    r"AKIA[0-9A-Z]{16}",
    r"AIza[0-9A-Za-z_\-]{35}",
    r"xox[abpr]-[A-Za-z0-9\-]{10,}",
    r"eyJ[A-Za-z0-9_\-]{8,}\.eyJ[A-Za-z0-9_\-]{8,}\.[A-Za-z0-9_\-]{16,}",
    r"(?i:bearer)\s+[A-Za-z0-9._~+/\-]{20,}=*",
];

/// Finds secret-shaped substrings in text.
#[derive(Debug, Clone)]
pub struct SecretScanner {
    combined: Regex,
}

impl SecretScanner {
    pub fn new() -> Result<Self, GuardError> {
        let combined = Regex::new(&SECRET_SHAPES.join("|"))?;
        Ok(Self { combined })
    }

    /// True if `text` contains any secret-shaped substring.
    pub fn contains_secret(&self, text: &str) -> bool {
        self.combined.is_match(text)
    }

    /// Every non-overlapping secret-shaped substring, in order.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.combined.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Number of secret-shaped substrings in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.combined.find_iter(text).count()
    }
}
