// hasher.rs — SHA-256 helpers. All hashes are lowercase hex.

use sha2::{Digest, Sha256};

/// SHA-256 of raw bytes as 64 lowercase hex characters.
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// SHA-256 of the UTF-8 bytes of `s`. Used to chain outcome log lines.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_value() {
        assert_eq!(
            hash_str(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn lowercase_hex_of_expected_length() {
        let hash = hash_bytes(b"warden");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
        assert_ne!(hash, hash_str("warden "));
    }
}
