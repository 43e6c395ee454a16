// Export all modules for public use
pub mod config;
pub mod crypto;
pub mod utils;

// Re-export the most commonly used items for convenience
pub use crate::crypto::encryption::{
    decrypt, encrypt, generate_room_key, verify_integrity, EncryptionError, RoomKeyMaterial,
};
pub use crate::crypto::envelope::{DecryptedMessage, Envelope, EnvelopeV1, EnvelopeV2};
pub use crate::crypto::keys::{ExportedPublicKey, KeyError, KeyStrength, SessionKey, SharedSecret};
pub use crate::crypto::session::{ChatSession, SessionError};
