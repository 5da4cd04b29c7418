//! Envelope encoding and decoding for the SecretDot protocol.
//!
//! Envelopes have two stored forms. The binary form is the default:
//!
//! - \[0\]:       suite id (0x01)
//! - \[1..33\]:   ephemeralPublicKey (32 bytes)
//! - \[33..45\]:  nonce (12 bytes)
//! - \[45..61\]:  tag (16 bytes)
//! - \[61..\]:    ciphertext (variable)
//!
//! The JSON form follows the `{version, nonce, ephemPublicKey, ciphertext}`
//! layout that browser wallets exchange, with base64 byte fields and the tag
//! appended to the ciphertext.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::types::{
    Result, SecretDotError, HEADER_SIZE, NONCE_SIZE, PUBLIC_KEY_SIZE,
    SUITE_X25519_CHACHA20POLY1305, SUITE_X25519_CHACHA20POLY1305_NAME, TAG_SIZE,
};

/// Algorithm suite carried in an envelope's version field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suite {
    /// X25519 key agreement, HKDF-SHA256, ChaCha20-Poly1305.
    X25519ChaCha20Poly1305,
}

impl Suite {
    /// Wire id used in the binary form.
    pub fn id(self) -> u8 {
        match self {
            Self::X25519ChaCha20Poly1305 => SUITE_X25519_CHACHA20POLY1305,
        }
    }

    /// Name used in the JSON form.
    pub fn name(self) -> &'static str {
        match self {
            Self::X25519ChaCha20Poly1305 => SUITE_X25519_CHACHA20POLY1305_NAME,
        }
    }

    /// Look up a suite by wire id.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            SUITE_X25519_CHACHA20POLY1305 => Ok(Self::X25519ChaCha20Poly1305),
            other => Err(SecretDotError::UnsupportedVersion(format!("0x{:02x}", other))),
        }
    }

    /// Look up a suite by name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            SUITE_X25519_CHACHA20POLY1305_NAME => Ok(Self::X25519ChaCha20Poly1305),
            other => Err(SecretDotError::UnsupportedVersion(other.to_string())),
        }
    }
}

/// Stored form of an envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeFormat {
    /// Tagged binary layout.
    #[default]
    Binary,
    /// Wallet-style JSON document.
    Json,
}

/// SecretDot message envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Algorithm suite.
    pub version: Suite,
    /// Ephemeral X25519 public key (32 bytes).
    pub ephemeral_public_key: [u8; 32],
    /// Nonce for encryption (12 bytes).
    pub nonce: [u8; 12],
    /// Encrypted message ciphertext (variable length).
    pub ciphertext: Vec<u8>,
    /// Poly1305 authentication tag (16 bytes).
    pub tag: [u8; 16],
}

#[derive(Deserialize)]
struct EnvelopeJson {
    nonce: String,
    #[serde(rename = "ephemPublicKey")]
    ephem_public_key: String,
    ciphertext: String,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: String,
}

impl Envelope {
    /// Encode the envelope to its binary form.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(HEADER_SIZE + self.ciphertext.len());
        data.push(self.version.id());
        data.extend_from_slice(&self.ephemeral_public_key);
        data.extend_from_slice(&self.nonce);
        data.extend_from_slice(&self.tag);
        data.extend_from_slice(&self.ciphertext);
        data
    }

    /// Decode the binary form.
    ///
    /// The suite id is checked before anything else is read.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let Some(&suite_id) = data.first() else {
            return Err(SecretDotError::MalformedEnvelope("empty input".to_string()));
        };
        let version = Suite::from_id(suite_id)?;

        if data.len() < HEADER_SIZE {
            return Err(SecretDotError::MalformedEnvelope(format!(
                "Data too short: {} bytes (minimum {})",
                data.len(),
                HEADER_SIZE
            )));
        }

        let mut offset = 1;

        let mut ephemeral_public_key = [0u8; 32];
        ephemeral_public_key.copy_from_slice(&data[offset..offset + PUBLIC_KEY_SIZE]);
        offset += PUBLIC_KEY_SIZE;

        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&data[offset..offset + NONCE_SIZE]);
        offset += NONCE_SIZE;

        let mut tag = [0u8; 16];
        tag.copy_from_slice(&data[offset..offset + TAG_SIZE]);
        offset += TAG_SIZE;

        let ciphertext = data[offset..].to_vec();

        Ok(Self {
            version,
            ephemeral_public_key,
            nonce,
            ciphertext,
            tag,
        })
    }

    /// Render the JSON form.
    pub fn to_json(&self) -> String {
        let mut sealed = Vec::with_capacity(self.ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(&self.ciphertext);
        sealed.extend_from_slice(&self.tag);

        serde_json::json!({
            "version": self.version.name(),
            "nonce": STANDARD.encode(self.nonce),
            "ephemPublicKey": STANDARD.encode(self.ephemeral_public_key),
            "ciphertext": STANDARD.encode(sealed),
        })
        .to_string()
    }

    /// Parse the JSON form.
    ///
    /// The `version` field is read and checked before the remaining fields
    /// are decoded.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let probe: VersionProbe = serde_json::from_slice(data)
            .map_err(|e| SecretDotError::MalformedEnvelope(format!("invalid JSON: {}", e)))?;
        let version = Suite::from_name(&probe.version)?;

        let doc: EnvelopeJson = serde_json::from_slice(data)
            .map_err(|e| SecretDotError::MalformedEnvelope(format!("invalid JSON: {}", e)))?;

        let nonce = decode_fixed::<NONCE_SIZE>("nonce", &doc.nonce)?;
        let ephemeral_public_key =
            decode_fixed::<PUBLIC_KEY_SIZE>("ephemPublicKey", &doc.ephem_public_key)?;

        let mut sealed = decode_base64("ciphertext", &doc.ciphertext)?;
        if sealed.len() < TAG_SIZE {
            return Err(SecretDotError::MalformedEnvelope(format!(
                "ciphertext too short: {} bytes (minimum {})",
                sealed.len(),
                TAG_SIZE
            )));
        }
        let tag_bytes = sealed.split_off(sealed.len() - TAG_SIZE);
        let mut tag = [0u8; 16];
        tag.copy_from_slice(&tag_bytes);

        Ok(Self {
            version,
            ephemeral_public_key,
            nonce,
            ciphertext: sealed,
            tag,
        })
    }

    /// Serialize in the given stored form.
    pub fn to_bytes(&self, format: EnvelopeFormat) -> Vec<u8> {
        match format {
            EnvelopeFormat::Binary => self.encode(),
            EnvelopeFormat::Json => self.to_json().into_bytes(),
        }
    }

    /// Parse either stored form. JSON is recognised by a leading `{`.
    pub fn from_stored(data: &[u8]) -> Result<Self> {
        if data.first() == Some(&b'{') {
            Self::from_json(data)
        } else {
            Self::decode(data)
        }
    }
}

/// Check if data looks like a binary envelope.
pub fn is_envelope(data: &[u8]) -> bool {
    if data.len() < HEADER_SIZE {
        return false;
    }
    Suite::from_id(data[0]).is_ok()
}

fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| SecretDotError::MalformedEnvelope(format!("{}: invalid base64: {}", field, e)))
}

fn decode_fixed<const N: usize>(field: &str, value: &str) -> Result<[u8; N]> {
    let bytes = decode_base64(field, value)?;
    bytes.as_slice().try_into().map_err(|_| {
        SecretDotError::MalformedEnvelope(format!(
            "{}: expected {} bytes, got {}",
            field,
            N,
            bytes.len()
        ))
    })
}
