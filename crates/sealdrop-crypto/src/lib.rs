//! # Sealdrop Crypto
//!
//! The cipher engine for the Sealdrop secure data-sharing platform.
//!
//! Sealdrop is a zero-trust design: the server stores opaque ciphertext and
//! opaque wrapped keys, and everything in this crate runs on the client. The
//! engine binds together:
//!
//! - **AES-256-GCM** payload sealing with a fresh random DEK and IV per file
//! - **ML-KEM-512** key encapsulation, wrapping the DEK once per recipient
//! - **SHA-256** fingerprints over the sealed ciphertext as an integrity
//!   receipt between client and server
//!
//! ## Wire formats
//!
//! ```text
//! Sealed blob:        IV (12 bytes) ∥ AES-GCM ciphertext ∥ tag (16 bytes)
//! Wrapped-key payload: KEM ciphertext (768 bytes) ∥ wrapped DEK (32 bytes)
//! ```
//!
//! The wrapped DEK is `DEK XOR shared-secret`: a one-time-pad wrap over a
//! single fresh encapsulation. Every share performs its own encapsulation,
//! so a shared secret is consumed for exactly one wrap and then discarded.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sealdrop_crypto::{engine, kem::KyberKeyPair};
//!
//! let owner = KyberKeyPair::generate()?;
//! let upload = engine::encrypt_and_wrap(owner.public_key(), b"payload", |_| {})?;
//! let plain = engine::decrypt_and_unwrap(
//!     owner.secret_key(),
//!     &upload.owner_wrap,
//!     &upload.blob,
//!     Some(&upload.fingerprint),
//! )?;
//! assert_eq!(plain, b"payload");
//! ```

pub mod engine;
pub mod error;
pub mod hashing;
pub mod kem;
pub mod keys;
pub mod symmetric;

pub use engine::{EncryptedUpload, UploadPhase};
pub use error::{CryptoError, Result};
pub use hashing::Fingerprint;
pub use kem::{
    KemPayload, KyberKeyPair, KyberPublicKey, KyberSecretKey, KEM_CIPHERTEXT_SIZE,
    KEM_PAYLOAD_SIZE, KYBER_PUBLIC_KEY_SIZE, KYBER_SECRET_KEY_SIZE, SHARED_SECRET_SIZE,
};
pub use keys::{Dek, Iv, DEK_SIZE, IV_SIZE};
pub use symmetric::TAG_SIZE;

/// Largest plaintext the engine will seal (bounded by the upload transport).
pub const MAX_PLAINTEXT_SIZE: usize = 100 * 1024 * 1024;
