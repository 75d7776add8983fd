//! Symmetric key material: the per-file DEK and the AES-GCM IV
//!
//! Both are drawn from the system RNG. A failed draw aborts the whole
//! operation; there is no deterministic fallback.

use crate::{CryptoError, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a data-encryption key in bytes (AES-256)
pub const DEK_SIZE: usize = 32;

/// Size of an AES-GCM IV in bytes (96 bits)
pub const IV_SIZE: usize = 12;

fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).map_err(|e| CryptoError::Rng(e.to_string()))?;
    Ok(buf)
}

/// A data-encryption key for one file.
///
/// Lives only transiently in client memory; wiped on drop on every exit
/// path, including unwind.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Dek([u8; DEK_SIZE]);

impl Dek {
    /// Draw a fresh random DEK
    pub fn generate() -> Result<Self> {
        Ok(Self(random_bytes()?))
    }

    /// Create a DEK from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != DEK_SIZE {
            return Err(CryptoError::BadKey(format!(
                "DEK must be {} bytes, got {}",
                DEK_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; DEK_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; DEK_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for Dek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dek([REDACTED])")
    }
}

/// An AES-GCM initialization vector.
///
/// Fresh per encryption; must never be reused with the same key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    /// Draw a fresh random IV
    pub fn generate() -> Result<Self> {
        Ok(Self(random_bytes()?))
    }

    /// Create an IV from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != IV_SIZE {
            return Err(CryptoError::BadKey(format!(
                "IV must be {} bytes, got {}",
                IV_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; IV_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the IV bytes
    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }

    /// Encode as base64 for JSON edges
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }

    /// Decode from base64
    pub fn from_base64(s: &str) -> Result<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD.decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for Iv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Iv({})", hex::encode(self.0))
    }
}
