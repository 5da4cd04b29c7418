//! Content-addressed references for stored envelopes.
//!
//! A reference is `Qm` followed by 46 hex characters taken from
//! `SHA-256(serialized_envelope || salt)`. The salt mixes in the send time and
//! recipient address so that identical envelopes sent at different times map
//! to different references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Result, SecretDotError, REFERENCE_HEX_LEN, REFERENCE_PREFIX};

/// Identifier of a stored envelope, recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference(String);

impl Reference {
    /// Length of a rendered reference in characters.
    pub const LEN: usize = REFERENCE_PREFIX.len() + REFERENCE_HEX_LEN;

    /// Parse and validate a rendered reference.
    pub fn parse(value: &str) -> Result<Self> {
        let Some(digits) = value.strip_prefix(REFERENCE_PREFIX) else {
            return Err(SecretDotError::InvalidReference(format!(
                "missing {} prefix: {}",
                REFERENCE_PREFIX, value
            )));
        };

        if digits.len() != REFERENCE_HEX_LEN {
            return Err(SecretDotError::InvalidReference(format!(
                "expected {} hex characters, got {}",
                REFERENCE_HEX_LEN,
                digits.len()
            )));
        }

        if !digits.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(SecretDotError::InvalidReference(format!(
                "not lowercase hex: {}",
                value
            )));
        }

        Ok(Self(value.to_string()))
    }

    /// The rendered reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Reference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Reference {
    type Err = SecretDotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Reference {
    type Error = SecretDotError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Reference> for String {
    fn from(reference: Reference) -> Self {
        reference.0
    }
}

/// Derive the reference for a serialized envelope.
///
/// Pure: the same inputs always produce the same reference.
pub fn compute_reference(serialized_envelope: &[u8], salt: &[u8]) -> Reference {
    let mut hasher = Sha256::new();
    hasher.update(serialized_envelope);
    hasher.update(salt);
    let digest = hasher.finalize();

    let mut rendered = String::with_capacity(Reference::LEN);
    rendered.push_str(REFERENCE_PREFIX);
    rendered.push_str(&hex::encode(digest)[..REFERENCE_HEX_LEN]);
    Reference(rendered)
}

/// Build the reference salt from a millisecond timestamp and the recipient.
pub fn reference_salt(timestamp_ms: u64, recipient: &str) -> Vec<u8> {
    let mut salt = timestamp_ms.to_string().into_bytes();
    salt.extend_from_slice(recipient.trim().as_bytes());
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";

    #[test]
    fn test_reference_shape() {
        let reference = compute_reference(b"envelope", &reference_salt(1_700_000_000_000, RECIPIENT));
        let rendered = reference.as_str();

        assert_eq!(rendered.len(), Reference::LEN);
        assert_eq!(rendered.len(), 48);
        assert!(rendered.starts_with("Qm"));
        assert_eq!(Reference::parse(rendered).unwrap(), reference);
    }

    #[test]
    fn test_known_digest() {
        // SHA-256("abc") = ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad
        let reference = compute_reference(b"ab", b"c");
        assert_eq!(reference.as_str(), "Qmba7816bf8f01cfea414140de5dae2223b00361a396177a");
    }

    #[test]
    fn test_deterministic() {
        let salt = reference_salt(42, RECIPIENT);
        assert_eq!(
            compute_reference(b"same bytes", &salt),
            compute_reference(b"same bytes", &salt)
        );
    }

    #[test]
    fn test_salt_changes_reference() {
        let first = compute_reference(b"same bytes", &reference_salt(1000, RECIPIENT));
        let later = compute_reference(b"same bytes", &reference_salt(1001, RECIPIENT));
        let other = compute_reference(b"same bytes", &reference_salt(1000, "0xdeadbeef"));

        assert_ne!(first, later);
        assert_ne!(first, other);
    }

    #[test]
    fn test_salt_trims_recipient() {
        assert_eq!(
            reference_salt(7, &format!("  {}\n", RECIPIENT)),
            reference_salt(7, RECIPIENT)
        );
        assert_eq!(reference_salt(7, "0xab"), b"70xab".to_vec());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let valid = compute_reference(b"x", b"y");
        let body = &valid.as_str()[2..];

        assert!(Reference::parse(&format!("Xm{}", body)).is_err());
        assert!(Reference::parse(&valid.as_str()[..47]).is_err());
        assert!(Reference::parse(&format!("Qm{}", body.to_uppercase())).is_err());
        assert!(Reference::parse("").is_err());
        assert!("Qmzz".parse::<Reference>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let reference = compute_reference(b"x", b"y");
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, format!("\"{}\"", reference));

        let back: Reference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reference);

        assert!(serde_json::from_str::<Reference>("\"QmNotHex\"").is_err());
    }
}
