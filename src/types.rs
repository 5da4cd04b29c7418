//! Type definitions and protocol constants for SecretDot.

use std::time::Duration;

use thiserror::Error;

use crate::reference::Reference;

/// Wire id of the only supported algorithm suite.
pub const SUITE_X25519_CHACHA20POLY1305: u8 = 0x01;

/// Name of the supported suite as it appears in JSON envelopes.
pub const SUITE_X25519_CHACHA20POLY1305_NAME: &str = "x25519-hkdf-sha256-chacha20poly1305";

/// Size of the binary envelope header in bytes.
pub const HEADER_SIZE: usize = 1 + PUBLIC_KEY_SIZE + NONCE_SIZE + TAG_SIZE;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Size of the nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of a public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of a private key in bytes.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Key derivation salt for seed-derived key pairs.
pub const KEY_DERIVATION_SALT: &[u8] = b"SecretDot-v1-encryption";

/// Key derivation info for seed-derived key pairs.
pub const KEY_DERIVATION_INFO: &[u8] = b"x25519-key";

/// HKDF info prefix for message encryption.
pub const ENCRYPTION_INFO_PREFIX: &[u8] = b"SecretDotV1";

/// Prefix of every rendered reference.
pub const REFERENCE_PREFIX: &str = "Qm";

/// Number of hex characters following the reference prefix.
pub const REFERENCE_HEX_LEN: usize = 46;

/// Errors that can occur during SecretDot operations.
#[derive(Error, Debug)]
pub enum SecretDotError {
    // Codec Errors
    /// Public or private key bytes are not usable for the suite.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Envelope names an algorithm suite this build does not implement.
    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(String),

    /// Envelope bytes are structurally invalid.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Wrong key or corrupted envelope. The two cases are deliberately not
    /// distinguished.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    // Orchestration Errors
    /// No usable public key is registered for the recipient.
    #[error("Public key not found for address: {0}")]
    RecipientKeyNotFound(String),

    /// The blob store has nothing under the reference.
    #[error("Blob not found: {0}")]
    BlobNotFound(Reference),

    /// A stored message could not be read.
    #[error("Could not decrypt message")]
    DecryptFailed,

    /// Plaintext exceeds the configured limit.
    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The blob was stored but the ledger rejected the inbox entry.
    #[error("Ledger append failed for {reference}: {source}")]
    LedgerAppendFailed {
        reference: Reference,
        #[source]
        source: Box<SecretDotError>,
    },

    // Collaborator Errors
    /// Ledger or blob store I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// A collaborator call did not complete in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    // Parsing Errors
    /// Not a well-formed reference string.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SecretDotError {
    /// Whether the caller may retry the failed operation unchanged.
    ///
    /// Only collaborator failures qualify. Codec errors are deterministic for
    /// a given input and a missing recipient key will not appear by retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::Timeout(_) => true,
            Self::LedgerAppendFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for SecretDotError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SecretDotError>;
