//! Error types for the sealdrop-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur inside the cipher engine
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key material has the wrong length or encoding
    #[error("bad key: {0}")]
    BadKey(String),

    /// Wrapped-key payload has the wrong length or failed to decapsulate
    #[error("bad payload: {0}")]
    BadPayload(String),

    /// Authentication tag or fingerprint verification failed; no plaintext
    /// is returned
    #[error("ciphertext integrity check failed")]
    Tampered,

    /// Plaintext exceeds the transport bound
    #[error("data too large: {size} bytes exceeds maximum {max} bytes")]
    DataTooLarge { size: u64, max: u64 },

    /// The system RNG failed; the operation aborts rather than fall back
    #[error("random generator failure: {0}")]
    Rng(String),

    /// Cipher initialization or encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Base64 decode error at a wire edge
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Hex decode error at a wire edge
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
