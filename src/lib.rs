//! SecretDot - Encrypted messaging over a ledger and a blob store
//!
//! Rust implementation of the SecretDot envelope protocol using X25519 +
//! HKDF-SHA256 + ChaCha20-Poly1305. Envelopes are stored off-ledger under a
//! content-derived reference; the ledger records only the reference.

mod types;
mod keys;
mod crypto;
mod envelope;
mod reference;
mod ledger;
mod storage;
mod models;
mod retry;
mod client;

pub use types::*;
pub use keys::*;
pub use crypto::*;
pub use envelope::*;
pub use reference::*;
pub use ledger::*;
pub use storage::*;
pub use models::*;
pub use retry::*;
pub use client::*;
