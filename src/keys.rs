//! Key derivation and management for SecretDot.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::types::{
    Result, SecretDotError, KEY_DERIVATION_INFO, KEY_DERIVATION_SALT, PRIVATE_KEY_SIZE,
    PUBLIC_KEY_SIZE,
};

/// An X25519 encryption key pair.
///
/// The public key is always derived from the secret, never stored
/// independently. `Debug` output shows only the public half.
#[derive(Clone)]
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        let (secret, public) = generate_ephemeral_keypair();
        Self { secret, public }
    }

    /// Derive a key pair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let (secret, public) = derive_keys_from_seed(seed)?;
        Ok(Self { secret, public })
    }

    /// Build a key pair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = parse_private_key(bytes)?;
        let public = PublicKey::from(&secret);
        Ok(Self { secret, public })
    }

    /// Build a key pair from a hex secret key, with or without `0x`.
    pub fn from_secret_hex(hex_key: &str) -> Result<Self> {
        let bytes = Zeroizing::new(decode_hex_key(hex_key)?);
        Self::from_secret_bytes(&bytes)
    }

    /// The secret half.
    pub fn secret(&self) -> &StaticSecret {
        &self.secret
    }

    /// The public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// The public key as raw bytes.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// The public key as `0x`-prefixed hex, the form registered on the ledger.
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.public.as_bytes()))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .finish_non_exhaustive()
    }
}

/// Derive X25519 key pair from a 32-byte seed using HKDF-SHA256.
///
/// # Arguments
/// * `seed` - 32-byte seed (e.g., from a wallet-held secret)
///
/// # Returns
/// Tuple of (private_key, public_key)
pub fn derive_keys_from_seed(seed: &[u8]) -> Result<(StaticSecret, PublicKey)> {
    if seed.len() != 32 {
        return Err(SecretDotError::InvalidKey(format!(
            "seed must be 32 bytes, got {}",
            seed.len()
        )));
    }

    let hkdf = Hkdf::<Sha256>::new(Some(KEY_DERIVATION_SALT), seed);
    let mut derived_key = Zeroizing::new([0u8; 32]);
    hkdf.expand(KEY_DERIVATION_INFO, &mut *derived_key)
        .map_err(|e| SecretDotError::InvalidKey(format!("HKDF expand failed: {}", e)))?;

    let private_key = StaticSecret::from(*derived_key);
    let public_key = PublicKey::from(&private_key);

    Ok((private_key, public_key))
}

/// Generate a random ephemeral X25519 key pair for message encryption.
pub fn generate_ephemeral_keypair() -> (StaticSecret, PublicKey) {
    let private_key = StaticSecret::random_from_rng(rand::thread_rng());
    let public_key = PublicKey::from(&private_key);
    (private_key, public_key)
}

/// Parse raw public key bytes.
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey> {
    let array: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
        SecretDotError::InvalidKey(format!(
            "public key must be {} bytes, got {}",
            PUBLIC_KEY_SIZE,
            bytes.len()
        ))
    })?;
    Ok(PublicKey::from(array))
}

/// Parse raw private key bytes.
pub fn parse_private_key(bytes: &[u8]) -> Result<StaticSecret> {
    let array: [u8; PRIVATE_KEY_SIZE] = bytes.try_into().map_err(|_| {
        SecretDotError::InvalidKey(format!(
            "private key must be {} bytes, got {}",
            PRIVATE_KEY_SIZE,
            bytes.len()
        ))
    })?;
    Ok(StaticSecret::from(array))
}

/// Decode a hex key string, accepting an optional `0x` prefix.
pub fn decode_hex_key(hex_key: &str) -> Result<Vec<u8>> {
    let trimmed = hex_key.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| SecretDotError::InvalidKey(format!("invalid hex: {}", e)))
}

/// Perform X25519 ECDH key exchange.
///
/// Returns `None` when the exchange is not contributory, i.e. the peer key
/// is a low-order point and the shared secret carries no entropy.
pub fn x25519_ecdh(
    private_key: &StaticSecret,
    public_key: &PublicKey,
) -> Option<Zeroizing<[u8; 32]>> {
    let shared = private_key.diffie_hellman(public_key);
    if !shared.was_contributory() {
        return None;
    }
    Some(Zeroizing::new(shared.to_bytes()))
}
