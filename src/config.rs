// src/config.rs
//! Protocol-wide constants for the chatseal message format.

/// Named curve used for all key agreement. Not configurable per call; both
/// peers must agree on it out of band.
pub const CURVE_NAME: &str = "P-256";

/// Cryptographic sizes (bytes)
pub const KEY_SIZE: usize = 32; // AES-256 / HKDF output
pub const NONCE_SIZE: usize = 12; // AES-GCM 96-bit nonce
pub const TAG_SIZE: usize = 16; // AES-GCM 128-bit authentication tag
pub const LEGACY_IV_SIZE: usize = 16; // AES-CBC block-sized IV (v1 envelopes)
pub const SALT_SIZE: usize = 32; // random salt before hex encoding
pub const MESSAGE_ID_SIZE: usize = 16; // random id bytes before hex encoding

/// Key derivation
pub const HKDF_INFO: &[u8] = b"CHATSEAL-E2E-KEY";
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Envelope format versions
pub const ENVELOPE_VERSION_LEGACY: u32 = 1;
pub const ENVELOPE_VERSION_CURRENT: u32 = 2;

/// Maximum skew tolerated between an envelope's stated timestamp and the
/// timestamp recovered from its authenticated payload during integrity
/// checks.
pub const TIMESTAMP_TOLERANCE_MS: u64 = 1_000;
