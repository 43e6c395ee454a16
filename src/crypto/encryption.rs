// src/crypto/encryption.rs
//! Symmetric message cipher for chat envelopes.
//!
//! Seals message payloads into v2 envelopes with AES-256-GCM (96-bit nonce,
//! detached 128-bit tag) and opens both v2 and legacy v1 (AES-256-CBC)
//! envelopes through a single entry point. New messages are always produced
//! as v2; the v1 path exists solely to read previously stored envelopes.
//!
//! Decryption is atomic: either the whole payload comes back authenticated,
//! or the caller gets [`EncryptionError::DecryptionFailed`] with no detail.
//! A wrong key, a tampered envelope, and a malformed encoding are
//! deliberately indistinguishable so the error cannot be used as an oracle.

use aes::Aes256;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use generic_array::GenericArray;
use hmac::Hmac;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::config::{
    ENVELOPE_VERSION_CURRENT, ENVELOPE_VERSION_LEGACY, KEY_SIZE, LEGACY_IV_SIZE, MESSAGE_ID_SIZE,
    NONCE_SIZE, PBKDF2_ITERATIONS, TAG_SIZE, TIMESTAMP_TOLERANCE_MS,
};
use crate::crypto::envelope::{DecryptedMessage, Envelope, EnvelopeV1, EnvelopeV2, MessagePayload};
use crate::crypto::keys::SessionKey;
use crate::utils;

type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Error type for cipher operations
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// A primitive failed while producing an envelope. No partial envelope
    /// is ever returned.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// The envelope could not be read. Carries no detail by design.
    #[error("cannot read this message")]
    DecryptionFailed,

    /// A key-derivation primitive was unavailable.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Room-scoped key material derived from a shared passphrase.
#[derive(Debug, Clone)]
pub struct RoomKeyMaterial {
    pub key: SessionKey,
    /// Deterministic salt, hex(SHA-256(room id)); identical on both peers.
    pub salt: String,
}

/// Encrypt a message into a v2 envelope.
///
/// Generates a fresh random 96-bit nonce and a 16-byte hex message id per
/// call; the nonce is never reused under the same key.
pub fn encrypt(content: &str, key: &SessionKey) -> Result<EnvelopeV2, EncryptionError> {
    let nonce_bytes = utils::random_bytes(NONCE_SIZE);
    let message_id = utils::random_hex_id(MESSAGE_ID_SIZE);
    let timestamp = utils::current_timestamp_millis();

    let payload = MessagePayload {
        content: content.to_string(),
        timestamp,
        message_id: message_id.clone(),
    };
    let plaintext = serde_json::to_vec(&payload)
        .map_err(|e| EncryptionError::EncryptionFailed(format!("payload serialization: {}", e)))?;

    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
    let nonce = Nonce::from_slice(&nonce_bytes);
    let mut sealed = cipher
        .encrypt(nonce, plaintext.as_slice())
        .map_err(|e| EncryptionError::EncryptionFailed(format!("AES-GCM: {}", e)))?;

    // AES-GCM appends the tag to the ciphertext; the wire format carries it
    // detached.
    let tag = sealed.split_off(sealed.len() - TAG_SIZE);

    debug!(ciphertext_len = sealed.len(), "sealed v2 envelope");
    Ok(EnvelopeV2 {
        encrypted_content: base64::encode(&sealed),
        iv: base64::encode(&nonce_bytes),
        tag: base64::encode(&tag),
        timestamp,
        message_id,
        version: ENVELOPE_VERSION_CURRENT,
    })
}

/// Decrypt an envelope of either format.
pub fn decrypt(envelope: &Envelope, key: &SessionKey) -> Result<DecryptedMessage, EncryptionError> {
    match envelope {
        Envelope::V2(v2) => decrypt_v2(v2, key),
        Envelope::V1(v1) => decrypt_legacy(v1, key),
    }
}

fn decrypt_v2(envelope: &EnvelopeV2, key: &SessionKey) -> Result<DecryptedMessage, EncryptionError> {
    if envelope.version != ENVELOPE_VERSION_CURRENT {
        debug!(version = envelope.version, "unsupported envelope version");
        return Err(EncryptionError::DecryptionFailed);
    }

    let ciphertext = decode_field(&envelope.encrypted_content)?;
    let nonce_bytes = decode_field(&envelope.iv)?;
    let tag = decode_field(&envelope.tag)?;
    if ciphertext.is_empty() || nonce_bytes.len() != NONCE_SIZE || tag.len() != TAG_SIZE {
        return Err(EncryptionError::DecryptionFailed);
    }

    // Reassemble ciphertext ‖ tag, the layout AES-GCM verifies in one pass.
    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_slice())
        .map_err(|_| {
            debug!("v2 envelope failed authentication");
            EncryptionError::DecryptionFailed
        })?;

    parse_payload(&plaintext, ENVELOPE_VERSION_CURRENT)
}

fn decrypt_legacy(
    envelope: &EnvelopeV1,
    key: &SessionKey,
) -> Result<DecryptedMessage, EncryptionError> {
    let ciphertext = decode_field(&envelope.encrypted_content)?;
    let iv = decode_field(&envelope.iv)?;
    if ciphertext.is_empty() || ciphertext.len() % LEGACY_IV_SIZE != 0 || iv.len() != LEGACY_IV_SIZE
    {
        return Err(EncryptionError::DecryptionFailed);
    }

    let decryptor = Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
        .map_err(|_| EncryptionError::DecryptionFailed)?;
    let mut buffer = vec![0u8; ciphertext.len()];
    let plaintext = decryptor
        .decrypt_padded_b2b_mut::<Pkcs7>(&ciphertext, &mut buffer)
        .map_err(|_| {
            debug!("v1 envelope failed to decrypt");
            EncryptionError::DecryptionFailed
        })?;

    parse_payload(plaintext, ENVELOPE_VERSION_LEGACY)
}

fn decode_field(encoded: &str) -> Result<Vec<u8>, EncryptionError> {
    base64::decode(encoded).map_err(|_| EncryptionError::DecryptionFailed)
}

fn parse_payload(plaintext: &[u8], version: u32) -> Result<DecryptedMessage, EncryptionError> {
    let text = std::str::from_utf8(plaintext).map_err(|_| EncryptionError::DecryptionFailed)?;
    // An empty decoded string is itself a decryption failure.
    if text.is_empty() {
        return Err(EncryptionError::DecryptionFailed);
    }
    let payload: MessagePayload =
        serde_json::from_str(text).map_err(|_| EncryptionError::DecryptionFailed)?;

    Ok(DecryptedMessage {
        content: payload.content,
        timestamp: payload.timestamp,
        message_id: payload.message_id,
        is_encrypted: true,
        version,
    })
}

/// Check that an envelope decrypts and that its stated metadata matches the
/// recovered payload: equal message ids and timestamps within
/// [`TIMESTAMP_TOLERANCE_MS`] of each other.
///
/// For v2 envelopes a `true` result rides on the AEAD tag, so the ciphertext
/// and payload are authentic under `key`. For v1 envelopes the legacy cipher
/// carries no tag; `true` only means the envelope decrypted and parsed
/// consistently and MUST NOT be treated as a cryptographic guarantee.
///
/// Never errors; any internal failure is reported as `false`.
pub fn verify_integrity(envelope: &Envelope, key: &SessionKey) -> bool {
    let recovered = match decrypt(envelope, key) {
        Ok(message) => message,
        Err(_) => return false,
    };
    if recovered.message_id != envelope.message_id() {
        return false;
    }
    recovered.timestamp.abs_diff(envelope.timestamp()) <= TIMESTAMP_TOLERANCE_MS
}

/// Derive a room-scoped symmetric key from a shared passphrase.
///
/// The salt is hex(SHA-256(room id)), so two peers sharing `room_id` and
/// `master_secret` derive identical material without exchanging anything.
/// PBKDF2-HMAC-SHA256 with [`PBKDF2_ITERATIONS`] rounds produces the key.
pub fn generate_room_key(
    room_id: &str,
    master_secret: &str,
) -> Result<RoomKeyMaterial, EncryptionError> {
    let salt = hex::encode(Sha256::digest(room_id.as_bytes()));

    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(
        master_secret.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut key,
    )
    .map_err(|e| EncryptionError::KeyDerivation(format!("PBKDF2: {}", e)))?;

    debug!(room_id, "derived room key");
    Ok(RoomKeyMaterial {
        key: SessionKey::from_bytes(key),
        salt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::BlockEncryptMut;

    type Aes256CbcEnc = cbc::Encryptor<Aes256>;

    fn test_key(byte: u8) -> SessionKey {
        SessionKey::from_bytes([byte; KEY_SIZE])
    }

    /// Fabricate a legacy v1 envelope the way the old cipher produced them.
    fn encrypt_legacy(content: &str, key: &SessionKey) -> EnvelopeV1 {
        let timestamp = utils::current_timestamp_millis();
        let message_id = utils::random_hex_id(MESSAGE_ID_SIZE);
        let payload = MessagePayload {
            content: content.to_string(),
            timestamp,
            message_id: message_id.clone(),
        };
        let plaintext = serde_json::to_vec(&payload).unwrap();

        let iv = utils::random_bytes(LEGACY_IV_SIZE);
        let encryptor = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv).unwrap();
        let mut buffer = vec![0u8; plaintext.len() + LEGACY_IV_SIZE];
        let ciphertext_len = encryptor
            .encrypt_padded_b2b_mut::<Pkcs7>(&plaintext, &mut buffer)
            .unwrap()
            .len();
        buffer.truncate(ciphertext_len);

        EnvelopeV1 {
            encrypted_content: base64::encode(&buffer),
            iv: base64::encode(&iv),
            tag: String::new(),
            timestamp,
            message_id,
        }
    }

    fn flip_bit_in_base64(encoded: &str) -> String {
        let mut bytes = base64::decode(encoded).unwrap();
        bytes[0] ^= 1;
        base64::encode(&bytes)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key(1);
        let envelope = encrypt("hello, sealed world", &key).unwrap();
        assert_eq!(envelope.version, ENVELOPE_VERSION_CURRENT);
        assert_eq!(envelope.message_id.len(), MESSAGE_ID_SIZE * 2);

        let message = decrypt(&envelope.clone().into(), &key).unwrap();
        assert_eq!(message.content, "hello, sealed world");
        assert_eq!(message.message_id, envelope.message_id);
        assert_eq!(message.timestamp, envelope.timestamp);
        assert!(message.is_encrypted);
        assert_eq!(message.version, 2);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let envelope = encrypt("secret", &test_key(2)).unwrap();
        let result = decrypt(&envelope.into(), &test_key(3));
        assert!(matches!(result, Err(EncryptionError::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_content_iv_and_tag_are_rejected() {
        let key = test_key(4);
        let envelope = encrypt("integrity matters", &key).unwrap();

        let mut tampered = envelope.clone();
        tampered.encrypted_content = flip_bit_in_base64(&envelope.encrypted_content);
        assert!(matches!(
            decrypt(&tampered.into(), &key),
            Err(EncryptionError::DecryptionFailed)
        ));

        let mut tampered = envelope.clone();
        tampered.iv = flip_bit_in_base64(&envelope.iv);
        assert!(matches!(
            decrypt(&tampered.into(), &key),
            Err(EncryptionError::DecryptionFailed)
        ));

        let mut tampered = envelope;
        tampered.tag = flip_bit_in_base64(&tampered.tag);
        assert!(matches!(
            decrypt(&tampered.into(), &key),
            Err(EncryptionError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let key = test_key(5);
        let first = encrypt("same message", &key).unwrap();
        let second = encrypt("same message", &key).unwrap();
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.message_id, second.message_id);
    }

    #[test]
    fn test_empty_encrypted_content_fails_cleanly() {
        let key = test_key(6);
        let reference = encrypt("x", &key).unwrap();
        let envelope = EnvelopeV2 {
            encrypted_content: String::new(),
            ..reference
        };
        assert!(matches!(
            decrypt(&envelope.into(), &key),
            Err(EncryptionError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_unsupported_version_fails_cleanly() {
        let key = test_key(7);
        let mut envelope = encrypt("from the future", &key).unwrap();
        envelope.version = 3;
        assert!(matches!(
            decrypt(&envelope.into(), &key),
            Err(EncryptionError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_legacy_envelope_decrypts_as_version_1() {
        let key = test_key(8);
        let envelope = encrypt_legacy("stored long ago", &key);
        assert_eq!(envelope.tag, "");

        let message = decrypt(&envelope.clone().into(), &key).unwrap();
        assert_eq!(message.content, "stored long ago");
        assert_eq!(message.version, 1);
        assert!(message.is_encrypted);

        // Legacy envelopes parsed from JSON without a version field take
        // the same path.
        let json = serde_json::to_string(&Envelope::V1(envelope)).unwrap();
        assert!(!json.contains("version"));
        let reparsed: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decrypt(&reparsed, &key).unwrap().version, 1);
    }

    #[test]
    fn test_legacy_envelope_wrong_key_fails() {
        let envelope = encrypt_legacy("legacy", &test_key(9));
        assert!(matches!(
            decrypt(&envelope.into(), &test_key(10)),
            Err(EncryptionError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_verify_integrity() {
        let key = test_key(11);
        let envelope = encrypt("check me", &key).unwrap();

        assert!(verify_integrity(&envelope.clone().into(), &key));
        assert!(!verify_integrity(&envelope.clone().into(), &test_key(12)));

        // A swapped message id on the outside of the envelope is caught even
        // though the ciphertext itself still authenticates.
        let mut relabeled = envelope;
        relabeled.message_id = utils::random_hex_id(MESSAGE_ID_SIZE);
        assert!(!verify_integrity(&relabeled.into(), &key));
    }

    #[test]
    fn test_verify_integrity_v1_is_parse_check_only() {
        let key = test_key(13);
        let envelope = encrypt_legacy("weakly checked", &key);
        assert!(verify_integrity(&envelope.clone().into(), &key));

        let mut relabeled = envelope;
        relabeled.message_id = "someone-else".into();
        assert!(!verify_integrity(&relabeled.into(), &key));
    }

    #[test]
    fn test_room_key_is_deterministic() {
        let a = generate_room_key("room-42", "correct horse battery staple").unwrap();
        let b = generate_room_key("room-42", "correct horse battery staple").unwrap();
        assert_eq!(a.salt, b.salt);
        assert_eq!(a.key.as_bytes(), b.key.as_bytes());

        let other_room = generate_room_key("room-43", "correct horse battery staple").unwrap();
        assert_ne!(a.key.as_bytes(), other_room.key.as_bytes());

        let other_secret = generate_room_key("room-42", "hunter2").unwrap();
        assert_ne!(a.key.as_bytes(), other_secret.key.as_bytes());
    }

    #[test]
    fn test_room_key_usable_for_messages() {
        let room = generate_room_key("room-42", "shared passphrase").unwrap();
        let envelope = encrypt("hello room", &room.key).unwrap();
        let message = decrypt(&envelope.into(), &room.key).unwrap();
        assert_eq!(message.content, "hello room");
    }
}
