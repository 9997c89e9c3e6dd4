//! Content address (`Oid`) for gait objects.
//!
//! Every persisted object (turn, commit, memory manifest) is identified by
//! the lowercase hex SHA-256 digest of its canonical-JSON encoding. `Oid` is
//! a thin wrapper over that hex string so the rest of the crate doesn't pass
//! raw `String`s around for something with this many invariants (fixed
//! length, hex-only alphabet, lowercase).

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex length of a SHA-256 digest (32 bytes -> 64 hex chars).
pub const OID_HEX_LEN: usize = 64;

/// Minimum prefix length accepted by [`crate::objects::ObjectStore::resolve`].
pub const MIN_PREFIX_LEN: usize = 4;

/// A SHA-256 content address, stored as lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oid(String);

impl Oid {
    /// Compute the content address of already-canonicalized bytes.
    pub fn of_bytes(data: &[u8]) -> Oid {
        let digest = Sha256::digest(data);
        Oid(hex::encode(digest))
    }

    /// Borrow the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this oid (as a string) starts with the given prefix.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Oid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != OID_HEX_LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("`{s}` is not a valid {OID_HEX_LEN}-char hex oid"));
        }
        Ok(Oid(s.to_ascii_lowercase()))
    }
}

impl From<String> for Oid {
    fn from(s: String) -> Self {
        Oid(s)
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Shorten an oid to its first 8 hex chars for display (log, status, etc.).
pub fn short_oid(oid: &str) -> &str {
    &oid[..oid.len().min(8)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_bytes_matches_known_sha256() {
        let oid = Oid::of_bytes(b"abc");
        assert_eq!(
            oid.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn from_str_rejects_wrong_length() {
        assert!(Oid::from_str("deadbeef").is_err());
    }

    #[test]
    fn from_str_lowercases() {
        let hex_upper = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        let oid = Oid::from_str(hex_upper).unwrap();
        assert_eq!(oid.as_str(), hex_upper.to_ascii_lowercase());
    }

    #[test]
    fn short_oid_truncates() {
        let s = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert_eq!(short_oid(s), "ba7816bf");
    }
}
