// src/crypto/keys.rs
//! Key agreement between chat peers.
//!
//! This module generates ephemeral P-256 key pairs, serializes public keys
//! as affine coordinates for transport, and combines a local private key
//! with a remote public key into a shared symmetric key via ECDH + HKDF.
//!
//! The private half of a key pair wraps `p256::ecdh::EphemeralSecret`, which
//! offers no byte accessor: "the private key never leaves its origin" holds
//! by construction rather than by convention. The derived [`SessionKey`] is
//! equally opaque; only the message cipher in this crate can read its bytes.
//!
//! ## Known limitation
//! An exported public key carries no identity binding. An active adversary
//! on the exchange channel can substitute its own key, and nothing in this
//! module would notice. Out-of-band fingerprint verification (or any other
//! binding) is a policy decision for the integrating system.

use hkdf::Hkdf;
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::rand_core::{OsRng, RngCore};
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{EncodedPoint, FieldBytes, PublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{CURVE_NAME, HKDF_INFO, KEY_SIZE, SALT_SIZE};

/// Error type for key-related operations
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key generation failed: {0}")]
    Generation(String),

    #[error("public key export failed: {0}")]
    Export(String),

    #[error("public key import failed: {0}")]
    Import(String),

    #[error("key agreement failed: {0}")]
    Agreement(String),
}

/// A symmetric key usable only by the message cipher in this crate.
///
/// The raw bytes are not reachable from outside the crate and are wiped
/// when the handle is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_SIZE]);

impl SessionKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Whether the shared secret went through HKDF strengthening or fell back
/// to the raw ECDH output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrength {
    /// ECDH output strengthened through HKDF-SHA256 with the protocol info
    /// string.
    Strengthened,
    /// Raw ECDH output. Still a valid 256-bit key, but auditors should see
    /// this path in the logs when it is taken.
    Unstrengthened,
}

/// Result of key agreement: the symmetric key plus the salt that produced
/// it. Both peers must reuse the same salt to re-derive an identical key.
#[derive(Debug, Clone)]
pub struct SharedSecret {
    pub key: SessionKey,
    pub salt: String,
    pub strength: KeyStrength,
}

/// An ephemeral P-256 key pair. The secret half cannot be serialized.
pub struct KeyPair {
    public: PublicKey,
    secret: EphemeralSecret,
}

impl KeyPair {
    /// The public half, suitable for export.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// A public key serialized as its two affine coordinates, each base64url
/// encoded (no padding). Safe to relay over any text transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedPublicKey {
    pub x: String,
    pub y: String,
}

/// Generate a fresh ephemeral key pair on the module curve.
pub fn generate_keypair() -> Result<KeyPair, KeyError> {
    let secret = EphemeralSecret::random(&mut OsRng);
    let public = PublicKey::from(&secret);
    debug!("generated ephemeral {} key pair", CURVE_NAME);
    Ok(KeyPair { public, secret })
}

/// Serialize a public key's affine coordinates for transport.
pub fn export_public_key(public: &PublicKey) -> Result<ExportedPublicKey, KeyError> {
    let point = public.to_encoded_point(false);
    let x = point
        .x()
        .ok_or_else(|| KeyError::Export("missing x coordinate".into()))?;
    let y = point
        .y()
        .ok_or_else(|| KeyError::Export("missing y coordinate".into()))?;

    Ok(ExportedPublicKey {
        x: base64::encode_config(x, base64::URL_SAFE_NO_PAD),
        y: base64::encode_config(y, base64::URL_SAFE_NO_PAD),
    })
}

/// Reconstruct a peer public key from exported coordinates.
///
/// The imported key is only a valid peer for agreement; it cannot encrypt
/// or decrypt anything by itself. Points not on the curve are rejected.
pub fn import_public_key(exported: &ExportedPublicKey) -> Result<PublicKey, KeyError> {
    let x = decode_coordinate(&exported.x, "x")?;
    let y = decode_coordinate(&exported.y, "y")?;

    let point = EncodedPoint::from_affine_coordinates(&x, &y, false);
    let key: Option<PublicKey> = PublicKey::from_encoded_point(&point).into();
    key.ok_or_else(|| KeyError::Import(format!("point is not on curve {}", CURVE_NAME)))
}

fn decode_coordinate(encoded: &str, which: &str) -> Result<FieldBytes, KeyError> {
    let bytes = base64::decode_config(encoded, base64::URL_SAFE_NO_PAD)
        .map_err(|e| KeyError::Import(format!("bad {} coordinate encoding: {}", which, e)))?;
    if bytes.len() != KEY_SIZE {
        return Err(KeyError::Import(format!(
            "{} coordinate must be {} bytes, got {}",
            which,
            KEY_SIZE,
            bytes.len()
        )));
    }
    Ok(FieldBytes::clone_from_slice(&bytes))
}

/// Derive a shared symmetric key from the local private key and a remote
/// public key.
///
/// When no salt is supplied, 32 random bytes are drawn and hex-encoded;
/// callers pass a known value (e.g. a room identifier) when both peers must
/// derive an identical key deterministically. The ECDH output is
/// strengthened through HKDF-SHA256; if that step fails the raw ECDH key is
/// used instead, the degradation is logged, and the result is marked
/// [`KeyStrength::Unstrengthened`].
pub fn derive_shared_secret(
    local: &KeyPair,
    remote: &PublicKey,
    salt: Option<&str>,
) -> Result<SharedSecret, KeyError> {
    let shared = local.secret.diffie_hellman(remote);
    let raw = shared.raw_secret_bytes().as_slice();

    let salt = match salt {
        Some(s) => s.to_string(),
        None => {
            let mut bytes = [0u8; SALT_SIZE];
            OsRng.fill_bytes(&mut bytes);
            hex::encode(bytes)
        }
    };

    let hkdf = Hkdf::<Sha256>::new(Some(salt.as_bytes()), raw);
    let mut strengthened = [0u8; KEY_SIZE];
    let (key, strength) = match hkdf.expand(HKDF_INFO, &mut strengthened) {
        Ok(()) => (strengthened, KeyStrength::Strengthened),
        Err(_) => {
            // Recoverable degradation, not a hard failure. Must stay visible.
            warn!("HKDF strengthening unavailable, falling back to raw ECDH output");
            let mut fallback = [0u8; KEY_SIZE];
            fallback.copy_from_slice(raw);
            (fallback, KeyStrength::Unstrengthened)
        }
    };

    debug!(strength = ?strength, "derived shared secret");
    Ok(SharedSecret {
        key: SessionKey::from_bytes(key),
        salt,
        strength,
    })
}

/// Sanity-check that agreement can be performed with `remote` and that the
/// local public key survives an export/import round trip.
///
/// This does NOT confirm that the remote peer derived a matching key; there
/// is no transcript confirmation step in this protocol. Returns `false` on
/// any internal failure, never an error.
pub fn verify_key_exchange(local: &KeyPair, remote: &PublicKey) -> bool {
    let exported = match export_public_key(local.public_key()) {
        Ok(e) => e,
        Err(_) => return false,
    };
    let reimported = match import_public_key(&exported) {
        Ok(k) => k,
        Err(_) => return false,
    };
    if &reimported != local.public_key() {
        return false;
    }
    derive_shared_secret(local, remote, Some("verify")).is_ok()
}
