// src/crypto/envelope.rs
//! Versioned wire envelope for encrypted chat messages.
//!
//! Two formats coexist so that newer authenticated-cipher messages can live
//! alongside stored legacy ones:
//!
//! - **v2** (current): AES-256-GCM ciphertext with a detached 128-bit tag
//!   and a 96-bit nonce, all base64. Carries an explicit `version` field.
//! - **v1** (legacy): AES-256-CBC ciphertext with no detachable tag. Has no
//!   `version` field; its `tag` field is vestigial and empty.
//!
//! Deserialization dispatches on the presence of `version`, so a single
//! [`Envelope`] value covers both and decryption can match exhaustively.
//! Field names follow the JavaScript wire format (`encryptedContent`,
//! `messageId`, ...), and every field round-trips losslessly through JSON.

use serde::{Deserialize, Serialize};

use crate::config::ENVELOPE_VERSION_LEGACY;

/// Plaintext JSON payload sealed inside an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessagePayload {
    pub content: String,
    pub timestamp: u64,
    pub message_id: String,
}

/// Legacy envelope produced by the pre-AEAD cipher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeV1 {
    /// Base64 AES-256-CBC ciphertext (padding included, no tag inside).
    pub encrypted_content: String,
    /// Base64 16-byte CBC initialization vector.
    pub iv: String,
    /// Vestigial; the legacy cipher has no detachable authentication tag.
    #[serde(default)]
    pub tag: String,
    /// Milliseconds since the Unix epoch, as stated by the sender.
    pub timestamp: u64,
    pub message_id: String,
}

/// Current envelope format: authenticated encryption with a detached tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeV2 {
    /// Base64 AES-256-GCM ciphertext, tag stripped.
    pub encrypted_content: String,
    /// Base64 96-bit nonce. Unique per (key, message); never reused.
    pub iv: String,
    /// Base64 128-bit authentication tag.
    pub tag: String,
    /// Milliseconds since the Unix epoch, as stated by the sender.
    pub timestamp: u64,
    /// 16 random bytes, hex encoded.
    pub message_id: String,
    /// Always 2 for this format.
    pub version: u32,
}

/// A received envelope of either format.
///
/// Untagged: a JSON object with a `version` field parses as [`EnvelopeV2`],
/// one without it falls through to [`EnvelopeV1`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    V2(EnvelopeV2),
    V1(EnvelopeV1),
}

impl Envelope {
    /// Envelope format version as stated on the wire.
    pub fn version(&self) -> u32 {
        match self {
            Envelope::V2(e) => e.version,
            Envelope::V1(_) => ENVELOPE_VERSION_LEGACY,
        }
    }

    /// Message identifier as stated on the wire (unauthenticated for v1).
    pub fn message_id(&self) -> &str {
        match self {
            Envelope::V2(e) => &e.message_id,
            Envelope::V1(e) => &e.message_id,
        }
    }

    /// Timestamp as stated on the wire (unauthenticated for v1).
    pub fn timestamp(&self) -> u64 {
        match self {
            Envelope::V2(e) => e.timestamp,
            Envelope::V1(e) => e.timestamp,
        }
    }
}

impl From<EnvelopeV2> for Envelope {
    fn from(envelope: EnvelopeV2) -> Self {
        Envelope::V2(envelope)
    }
}

impl From<EnvelopeV1> for Envelope {
    fn from(envelope: EnvelopeV1) -> Self {
        Envelope::V1(envelope)
    }
}

/// Recovered plaintext plus envelope metadata, produced only after the
/// cipher accepted the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedMessage {
    pub content: String,
    pub timestamp: u64,
    pub message_id: String,
    pub is_encrypted: bool,
    pub version: u32,
}
