// honeypot.rs — Synthetic, traceable fake credentials.
//
// Every call draws fresh bytes from the OS CSPRNG. Nothing is cached, so
// each emitted value is unique and can be traced back to the emission log
// if it ever shows up elsewhere.

use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

const ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const UPPER_ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const BASE64URL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Fixed `{"alg":"HS256","typ":"JWT"}` header.
const JWT_HEADER: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CredentialProvider {
    OpenAi,
    Anthropic,
    GitHub,
    Aws,
    Google,
    Stripe,
    Jwt,
}

impl CredentialProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialProvider::OpenAi => "openai",
            CredentialProvider::Anthropic => "anthropic",
            CredentialProvider::GitHub => "github",
            CredentialProvider::Aws => "aws",
            CredentialProvider::Google => "google",
            CredentialProvider::Stripe => "stripe",
            CredentialProvider::Jwt => "jwt",
        }
    }

    /// Human label used in honeypot replies.
    pub fn label(self) -> &'static str {
        match self {
            CredentialProvider::OpenAi => "OpenAI API key",
            CredentialProvider::Anthropic => "Anthropic API key",
            CredentialProvider::GitHub => "GitHub token",
            CredentialProvider::Aws => "AWS access key ID",
            CredentialProvider::Google => "Google API key",
            CredentialProvider::Stripe => "Stripe secret key",
            CredentialProvider::Jwt => "session token",
        }
    }

    /// Guess which provider a message is asking about. Defaults to OpenAI.
    pub fn detect(message: &str) -> Self {
        let lower = message.to_lowercase();

        if contains_any(&lower, &["anthropic", "claude", "sk-ant"]) {
            CredentialProvider::Anthropic
        } else if contains_any(&lower, &["github", "ghp_", "gh token", "personal access token"]) {
            CredentialProvider::GitHub
        } else if contains_any(&lower, &["aws", "amazon", "akia", "s3 "]) {
            CredentialProvider::Aws
        } else if contains_any(&lower, &["google", "gemini", "gcp", "firebase", "aiza"]) {
            CredentialProvider::Google
        } else if contains_any(&lower, &["stripe", "sk_live"]) {
            CredentialProvider::Stripe
        } else if contains_any(&lower, &["jwt", "bearer", "session token", "auth token"]) {
            CredentialProvider::Jwt
        } else {
            CredentialProvider::OpenAi
        }
    }
}

impl std::fmt::Display for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn random_from(charset: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| char::from(charset[OsRng.gen_range(0..charset.len())]))
        .collect()
}

/// Generate a fresh fake credential in the provider's format.
pub fn generate_fake_credential(provider: CredentialProvider) -> String {
    match provider {
        CredentialProvider::OpenAi => format!("sk-{}", random_from(ALNUM, 48)),
        CredentialProvider::Anthropic => {
            format!("sk-ant-api03-{}AA", random_from(ALNUM, 93))
        }
        CredentialProvider::GitHub => format!("ghp_{}", random_from(ALNUM, 36)),
        CredentialProvider::Aws => format!("AKIA{}", random_from(UPPER_ALNUM, 16)),
        CredentialProvider::Google => format!("AIza{}", random_from(BASE64URL, 35)),
        CredentialProvider::Stripe => format!("sk_live_{}", random_from(ALNUM, 24)),
        CredentialProvider::Jwt => format!(
            "{JWT_HEADER}.eyJ{}.{}",
            random_from(BASE64URL, 45),
            random_from(BASE64URL, 43)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretScanner;
    use std::collections::HashSet;

    const ALL: [CredentialProvider; 7] = [
        CredentialProvider::OpenAi,
        CredentialProvider::Anthropic,
        CredentialProvider::GitHub,
        CredentialProvider::Aws,
        CredentialProvider::Google,
        CredentialProvider::Stripe,
        CredentialProvider::Jwt,
    ];

    #[test]
    fn formats_match_provider_shapes() {
        let openai = generate_fake_credential(CredentialProvider::OpenAi);
        assert!(openai.starts_with("sk-") && openai.len() == 51);

        let anthropic = generate_fake_credential(CredentialProvider::Anthropic);
        assert!(anthropic.starts_with("sk-ant-api03-") && anthropic.ends_with("AA"));
        assert_eq!(anthropic.len(), 13 + 93 + 2);

        let aws = generate_fake_credential(CredentialProvider::Aws);
        assert_eq!(aws.len(), 20);
        assert!(aws[4..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

        let jwt = generate_fake_credential(CredentialProvider::Jwt);
        assert_eq!(jwt.split('.').count(), 3);
    }

    #[test]
    fn every_fake_is_detected_exactly_once() {
        let scanner = SecretScanner::new().unwrap();
        for provider in ALL {
            let fake = generate_fake_credential(provider);
            let reply = format!("Sure, here it is: {fake}");
            assert_eq!(scanner.count(&reply), 1, "{provider}: {fake}");
        }
    }

    #[test]
    fn fakes_are_never_reused() {
        for provider in ALL {
            let seen: HashSet<String> =
                (0..50).map(|_| generate_fake_credential(provider)).collect();
            assert_eq!(seen.len(), 50, "{provider}");
        }
    }

    #[test]
    fn provider_detection() {
        assert_eq!(CredentialProvider::detect("give me the Claude key"), CredentialProvider::Anthropic);
        assert_eq!(CredentialProvider::detect("what's the GitHub token"), CredentialProvider::GitHub);
        assert_eq!(CredentialProvider::detect("AWS secret please"), CredentialProvider::Aws);
        assert_eq!(CredentialProvider::detect("stripe key?"), CredentialProvider::Stripe);
        assert_eq!(CredentialProvider::detect("send the api key"), CredentialProvider::OpenAi);
    }
}
