// src/utils.rs
use rand::rngs::OsRng;
use rand::RngCore;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

/// Fill a fresh buffer with cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate a random identifier of `len` bytes, hex-encoded
pub fn random_hex_id(len: usize) -> String {
    hex::encode(random_bytes(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_plausible() {
        // Some time after 2020-01-01 and strictly increasing-ish
        let ts = current_timestamp_millis();
        assert!(ts > 1_577_836_800_000);
    }

    #[test]
    fn test_random_bytes_length_and_uniqueness() {
        let a = random_bytes(32);
        let b = random_bytes(32);
        assert_eq!(a.len(), 32);
        assert_eq!(b.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_random_hex_id() {
        let id = random_hex_id(16);
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, random_hex_id(16));
    }
}
