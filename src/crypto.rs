//! Encryption and decryption of SecretDot envelopes.
//!
//! Each message is sealed to the recipient's X25519 public key with a fresh
//! ephemeral key pair. The shared secret is stretched with HKDF-SHA256 and
//! the plaintext sealed with ChaCha20-Poly1305. The envelope header (suite,
//! ephemeral key, nonce) is bound in as associated data.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Nonce, Tag,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::envelope::{Envelope, Suite};
use crate::keys::{
    generate_ephemeral_keypair, parse_private_key, parse_public_key, x25519_ecdh,
};
use crate::types::{Result, SecretDotError, ENCRYPTION_INFO_PREFIX, NONCE_SIZE};

/// Encrypt a message for a recipient.
///
/// # Arguments
/// * `plaintext` - Message bytes to encrypt
/// * `recipient_public_key` - Recipient's X25519 public key (32 bytes)
///
/// # Returns
/// Envelope containing the encrypted message
pub fn encrypt_message(plaintext: &[u8], recipient_public_key: &[u8]) -> Result<Envelope> {
    let recipient_public = parse_public_key(recipient_public_key)?;

    // Generate ephemeral key pair for this message
    let (ephemeral_private, ephemeral_public) = generate_ephemeral_keypair();

    let shared_secret = x25519_ecdh(&ephemeral_private, &recipient_public).ok_or_else(|| {
        SecretDotError::InvalidKey("recipient public key is a low-order point".to_string())
    })?;

    let symmetric_key = derive_message_key(
        &shared_secret,
        ephemeral_public.as_bytes(),
        recipient_public.as_bytes(),
    )
    .map_err(|e| SecretDotError::EncryptionFailed(format!("HKDF expand failed: {}", e)))?;

    // Generate random nonce
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let version = Suite::X25519ChaCha20Poly1305;
    let aad = header_aad(version, ephemeral_public.as_bytes(), &nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(symmetric_key.as_slice())
        .map_err(|e| SecretDotError::EncryptionFailed(format!("Cipher init failed: {}", e)))?;

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce_bytes), &aad, &mut ciphertext)
        .map_err(|e| SecretDotError::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    Ok(Envelope {
        version,
        ephemeral_public_key: *ephemeral_public.as_bytes(),
        nonce: nonce_bytes,
        ciphertext,
        tag: tag.into(),
    })
}

/// Decrypt an envelope with the recipient's private key.
///
/// Any failure after the envelope has been parsed, including a wrong key,
/// is reported as [`SecretDotError::AuthenticationFailed`].
pub fn decrypt_message(
    envelope: &Envelope,
    recipient_private_key: &StaticSecret,
) -> Result<Vec<u8>> {
    match envelope.version {
        Suite::X25519ChaCha20Poly1305 => {
            decrypt_x25519_chacha20poly1305(envelope, recipient_private_key)
        }
    }
}

/// Decrypt an envelope with a raw 32-byte private key.
pub fn decrypt_message_with_bytes(envelope: &Envelope, private_key: &[u8]) -> Result<Vec<u8>> {
    let secret = parse_private_key(private_key)?;
    decrypt_message(envelope, &secret)
}

fn decrypt_x25519_chacha20poly1305(
    envelope: &Envelope,
    recipient_private_key: &StaticSecret,
) -> Result<Vec<u8>> {
    let recipient_public = PublicKey::from(recipient_private_key);
    let ephemeral_public = PublicKey::from(envelope.ephemeral_public_key);

    let shared_secret = x25519_ecdh(recipient_private_key, &ephemeral_public)
        .ok_or(SecretDotError::AuthenticationFailed)?;

    let symmetric_key = derive_message_key(
        &shared_secret,
        &envelope.ephemeral_public_key,
        recipient_public.as_bytes(),
    )
    .map_err(|_| SecretDotError::AuthenticationFailed)?;

    let cipher = ChaCha20Poly1305::new_from_slice(symmetric_key.as_slice())
        .map_err(|_| SecretDotError::AuthenticationFailed)?;

    let aad = header_aad(envelope.version, &envelope.ephemeral_public_key, &envelope.nonce);
    let mut plaintext = envelope.ciphertext.clone();

    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&envelope.nonce),
            &aad,
            &mut plaintext,
            Tag::from_slice(&envelope.tag),
        )
        .map_err(|_| SecretDotError::AuthenticationFailed)?;

    Ok(plaintext)
}

fn derive_message_key(
    shared_secret: &[u8; 32],
    ephemeral_public_key: &[u8; 32],
    recipient_public_key: &[u8; 32],
) -> std::result::Result<Zeroizing<[u8; 32]>, hkdf::InvalidLength> {
    // Build info: prefix + ephemeral pubkey + recipient pubkey
    let mut info = Vec::with_capacity(ENCRYPTION_INFO_PREFIX.len() + 64);
    info.extend_from_slice(ENCRYPTION_INFO_PREFIX);
    info.extend_from_slice(ephemeral_public_key);
    info.extend_from_slice(recipient_public_key);

    let hkdf = Hkdf::<Sha256>::new(Some(ephemeral_public_key), shared_secret);
    let mut symmetric_key = Zeroizing::new([0u8; 32]);
    hkdf.expand(&info, &mut *symmetric_key)?;
    Ok(symmetric_key)
}

fn header_aad(version: Suite, ephemeral_public_key: &[u8; 32], nonce: &[u8; 12]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(1 + 32 + NONCE_SIZE);
    aad.push(version.id());
    aad.extend_from_slice(ephemeral_public_key);
    aad.extend_from_slice(nonce);
    aad
}
