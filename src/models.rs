//! Data models for SecretDot.
//!
//! This module defines the per-message results handed back to callers when
//! reading an inbox.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::ledger::InboxEntry;
use crate::reference::Reference;

/// Why a single inbox entry could not be read.
///
/// Users see "message exists but cannot be read". Missing blobs stay
/// distinguishable from undecryptable ones; every decryption failure mode
/// collapses into [`ReadError::DecryptFailed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The blob store has nothing under the entry's reference.
    #[error("Message content not found")]
    BlobNotFound,

    /// The envelope could not be parsed or authenticated with our key.
    #[error("Could not decrypt message")]
    DecryptFailed,

    /// The blob store could not be reached; retrying may help.
    #[error("Message content unavailable: {0}")]
    Unavailable(String),
}

impl ReadError {
    /// Whether reading the entry again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A message read from the inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Reference recorded on the ledger.
    pub reference: Reference,
    /// Sender address.
    pub sender: String,
    /// Unix time in seconds, as recorded by the ledger.
    pub timestamp: u64,
    /// Decrypted plaintext, or why it could not be produced.
    pub content: Result<Vec<u8>, ReadError>,
}

impl ReceivedMessage {
    /// Creates a received message from its inbox entry and read outcome.
    pub fn new(entry: &InboxEntry, content: Result<Vec<u8>, ReadError>) -> Self {
        Self {
            reference: entry.reference.clone(),
            sender: entry.sender.clone(),
            timestamp: entry.timestamp,
            content,
        }
    }

    /// Whether the plaintext was recovered.
    pub fn is_ok(&self) -> bool {
        self.content.is_ok()
    }

    /// The plaintext as text, if it was recovered and is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_ref()
            .ok()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// The ledger timestamp as a `SystemTime`.
    pub fn sent_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.timestamp)
    }
}
