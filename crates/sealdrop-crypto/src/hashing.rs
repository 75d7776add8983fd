//! SHA-256 ciphertext fingerprints
//!
//! The fingerprint is computed over the sealed ciphertext-and-tag, never
//! over plaintext, and travels as lowercase hex. It serves as an integrity
//! receipt between client and server.

use crate::{CryptoError, Result};
use sha2::{Digest, Sha256};
use std::fmt;

/// Size of a SHA-256 digest in bytes
pub const FINGERPRINT_SIZE: usize = 32;

/// A SHA-256 fingerprint of a sealed blob
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// Compute the fingerprint of the given bytes
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Parse from lowercase hex
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        if bytes.len() != FINGERPRINT_SIZE {
            return Err(CryptoError::BadKey(format!(
                "fingerprint must be {} bytes, got {}",
                FINGERPRINT_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; FINGERPRINT_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Render as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the digest bytes
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }

    /// Verify that `data` hashes to this fingerprint; mismatch is `Tampered`
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        if Self::digest(data) == *self {
            Ok(())
        } else {
            Err(CryptoError::Tampered)
        }
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
