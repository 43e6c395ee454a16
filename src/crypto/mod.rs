// src/crypto/mod.rs
//! End-to-end encryption for chat messages.
//!
//! Three pieces compose this module, bottom-up:
//!
//! - [`keys`]: ephemeral P-256 key pairs, public-key transport encoding,
//!   and ECDH + HKDF shared-secret derivation.
//! - [`encryption`] / [`envelope`]: the symmetric message cipher and its
//!   versioned wire envelope (v2 AES-256-GCM, legacy v1 AES-256-CBC).
//! - [`session`]: the per-conversation lifecycle tying the two together.
//!
//! ## Protocol flow
//! ```text
//! Peer A                      Transport (untrusted)              Peer B
//!   |                               |                              |
//!   | 1. session.initialize()      |                              |
//!   |    -> ExportedPublicKey {x,y}|                              |
//!   |------------------------------>----------------------------->|
//!   |                               |      2. session.initialize()|
//!   |<------------------------------<-----------------------------|
//!   |                               |                              |
//!   | 3. Both: set_remote_public_key(peer_key, salt)               |
//!   |    shared = HKDF(ECDH(local_priv, remote_pub), salt)         |
//!   |                               |                              |
//!   | 4. encrypt(msg, session_key) |                              |
//!   |    -> Envelope (v2)          |                              |
//!   |------------------------------>----------------------------->|
//!   |                               |  5. decrypt(envelope, key)   |
//! ```
//!
//! The transport only ever sees exported public keys and envelopes; neither
//! private keys nor derived symmetric keys are serializable. Public keys are
//! NOT authenticated here — binding them to identities is left to the
//! integrating system.

pub mod encryption;
pub mod envelope;
pub mod keys;
pub mod session;

pub use encryption::{
    decrypt, encrypt, generate_room_key, verify_integrity, EncryptionError, RoomKeyMaterial,
};
pub use envelope::{DecryptedMessage, Envelope, EnvelopeV1, EnvelopeV2};
pub use keys::{
    derive_shared_secret, export_public_key, generate_keypair, import_public_key,
    verify_key_exchange, ExportedPublicKey, KeyError, KeyPair, KeyStrength, SessionKey,
    SharedSecret,
};
pub use session::{ChatSession, SessionError};
