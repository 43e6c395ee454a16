// src/crypto/session.rs
//! Per-conversation session lifecycle.
//!
//! One [`ChatSession`] owns exactly one peer relationship and walks the
//! state machine Uninitialized → Initialized (local key pair exists) →
//! Established (shared secret exists) → Cleared. There is no global state;
//! callers holding several conversations hold several sessions. The session
//! is not internally synchronized — wrap it externally if it must be shared
//! across threads.

use thiserror::Error;
use tracing::{debug, info};

use crate::crypto::keys::{
    self, ExportedPublicKey, KeyError, KeyPair, SessionKey, SharedSecret,
};

/// Error type for session state violations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("local key pair not initialized")]
    NotInitialized,

    #[error("shared secret not established")]
    NotEstablished,

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Key material and state for one conversation with one peer.
#[derive(Debug, Default)]
pub struct ChatSession {
    local: Option<KeyPair>,
    secret: Option<SharedSecret>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh local key pair and return its exported public key
    /// for transmission to the peer.
    ///
    /// Re-calling discards any previous pair and shared secret; the peer
    /// must be given the new public key before messages can flow again.
    pub fn initialize(&mut self) -> Result<ExportedPublicKey, SessionError> {
        let pair = keys::generate_keypair()?;
        let exported = keys::export_public_key(pair.public_key())?;
        self.local = Some(pair);
        self.secret = None;
        debug!("session initialized with fresh key pair");
        Ok(exported)
    }

    /// Import the peer's exported public key and derive the shared secret.
    ///
    /// Pass the same `salt` on both sides (e.g. a room identifier) when the
    /// peers must derive an identical key deterministically; `None` draws a
    /// random salt, available afterwards via [`ChatSession::shared_secret`].
    pub fn set_remote_public_key(
        &mut self,
        exported: &ExportedPublicKey,
        salt: Option<&str>,
    ) -> Result<(), SessionError> {
        let local = self.local.as_ref().ok_or(SessionError::NotInitialized)?;
        let remote = keys::import_public_key(exported)?;
        let secret = keys::derive_shared_secret(local, &remote, salt)?;
        info!(strength = ?secret.strength, "session established");
        self.secret = Some(secret);
        Ok(())
    }

    /// The established shared secret. Fails unless the session reached the
    /// Established state.
    pub fn shared_secret(&self) -> Result<&SharedSecret, SessionError> {
        self.secret.as_ref().ok_or(SessionError::NotEstablished)
    }

    /// The symmetric key for use with the message cipher.
    pub fn session_key(&self) -> Result<&SessionKey, SessionError> {
        Ok(&self.shared_secret()?.key)
    }

    /// True iff the shared secret has been established.
    pub fn is_ready(&self) -> bool {
        self.secret.is_some()
    }

    /// Drop all key material. The session is unusable until a fresh
    /// [`ChatSession::initialize`].
    pub fn clear(&mut self) {
        self.local = None;
        self.secret = None;
        debug!("session cleared");
    }
}
