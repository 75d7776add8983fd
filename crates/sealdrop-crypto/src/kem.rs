//! ML-KEM-512 key encapsulation and the wrapped-key payload
//!
//! Every share, including the owner's own wrap at upload time, performs a
//! fresh encapsulation against the recipient's public key and wraps the DEK
//! as `DEK XOR shared-secret`. The shared secret is exactly DEK-sized and is
//! consumed for one wrap, so the XOR is a one-time pad over an independent
//! IND-CCA2 secret. The resulting wire payload is:
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────┐
//! │  KEM ciphertext (768 bytes)  │  wrapped DEK (32 bytes)  │
//! └──────────────────────────────┴──────────────────────────┘
//! Total: 800 bytes
//! ```
//!
//! The server stores and routes these payloads without ever being able to
//! open them; only the holder of the matching secret key recovers the DEK.

use crate::{
    keys::{Dek, DEK_SIZE},
    CryptoError, Result,
};
use pqc_kyber::{
    decapsulate as kyber_decapsulate, encapsulate as kyber_encapsulate, keypair as kyber_keypair,
    KYBER_CIPHERTEXTBYTES, KYBER_PUBLICKEYBYTES, KYBER_SECRETKEYBYTES, KYBER_SSBYTES,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an ML-KEM-512 public key
pub const KYBER_PUBLIC_KEY_SIZE: usize = KYBER_PUBLICKEYBYTES;

/// Size of an ML-KEM-512 secret key
pub const KYBER_SECRET_KEY_SIZE: usize = KYBER_SECRETKEYBYTES;

/// Size of an ML-KEM-512 encapsulation ciphertext
pub const KEM_CIPHERTEXT_SIZE: usize = KYBER_CIPHERTEXTBYTES;

/// Size of the encapsulated shared secret
pub const SHARED_SECRET_SIZE: usize = KYBER_SSBYTES;

/// Size of a wrapped-key payload: KEM ciphertext plus XOR-wrapped DEK
pub const KEM_PAYLOAD_SIZE: usize = KEM_CIPHERTEXT_SIZE + DEK_SIZE;

/// RNG bridge from getrandom to the rand_core traits pqc_kyber expects
struct KemRng;

impl pqc_kyber::RngCore for KemRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        getrandom::getrandom(&mut buf).expect("system RNG failure");
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        getrandom::getrandom(&mut buf).expect("system RNG failure");
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        getrandom::getrandom(dest).expect("system RNG failure");
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> core::result::Result<(), rand::Error> {
        getrandom::getrandom(dest).map_err(|e| {
            rand::Error::new(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })
    }
}

impl pqc_kyber::CryptoRng for KemRng {}

/// An ML-KEM-512 public key
#[derive(Clone, PartialEq, Eq)]
pub struct KyberPublicKey([u8; KYBER_PUBLIC_KEY_SIZE]);

impl KyberPublicKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KYBER_PUBLIC_KEY_SIZE {
            return Err(CryptoError::BadKey(format!(
                "public key must be {} bytes, got {}",
                KYBER_PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; KYBER_PUBLIC_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KYBER_PUBLIC_KEY_SIZE] {
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

impl std::fmt::Debug for KyberPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KyberPublicKey(ml-kem-512, {} bytes)", KYBER_PUBLIC_KEY_SIZE)
    }
}

/// An ML-KEM-512 secret key.
///
/// Never leaves the local keystore; wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KyberSecretKey([u8; KYBER_SECRET_KEY_SIZE]);

impl KyberSecretKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KYBER_SECRET_KEY_SIZE {
            return Err(CryptoError::BadKey(format!(
                "secret key must be {} bytes, got {}",
                KYBER_SECRET_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; KYBER_SECRET_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the key bytes (handle with care)
    pub fn as_bytes(&self) -> &[u8; KYBER_SECRET_KEY_SIZE] {
        &self.0
    }

    /// Encode as base64 (keystore persistence only)
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

impl std::fmt::Debug for KyberSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KyberSecretKey(ml-kem-512, [REDACTED])")
    }
}

/// An ML-KEM-512 keypair
#[derive(Clone)]
pub struct KyberKeyPair {
    public: KyberPublicKey,
    secret: KyberSecretKey,
}

impl KyberKeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Result<Self> {
        let keys = kyber_keypair(&mut KemRng)
            .map_err(|e| CryptoError::Rng(format!("keypair generation failed: {e:?}")))?;
        Ok(Self {
            public: KyberPublicKey(keys.public),
            secret: KyberSecretKey(keys.secret),
        })
    }

    /// Reconstruct from stored halves
    pub fn from_parts(public: KyberPublicKey, secret: KyberSecretKey) -> Self {
        Self { public, secret }
    }

    /// Get the public key
    pub fn public_key(&self) -> &KyberPublicKey {
        &self.public
    }

    /// Get the secret key
    pub fn secret_key(&self) -> &KyberSecretKey {
        &self.secret
    }
}

/// The freshly encapsulated shared secret; consumed by exactly one wrap
#[derive(Zeroize, ZeroizeOnDrop)]
struct SharedSecret([u8; SHARED_SECRET_SIZE]);

/// A wrapped-key payload: `kem_ct(768) ∥ wrapped_dek(32)`
#[derive(Clone, PartialEq, Eq)]
pub struct KemPayload {
    kem_ct: [u8; KEM_CIPHERTEXT_SIZE],
    wrapped: [u8; DEK_SIZE],
}

impl KemPayload {
    /// Split an 800-byte payload into its parts
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEM_PAYLOAD_SIZE {
            return Err(CryptoError::BadPayload(format!(
                "wrapped-key payload must be {} bytes, got {}",
                KEM_PAYLOAD_SIZE,
                bytes.len()
            )));
        }
        let mut kem_ct = [0u8; KEM_CIPHERTEXT_SIZE];
        let mut wrapped = [0u8; DEK_SIZE];
        kem_ct.copy_from_slice(&bytes[..KEM_CIPHERTEXT_SIZE]);
        wrapped.copy_from_slice(&bytes[KEM_CIPHERTEXT_SIZE..]);
        Ok(Self { kem_ct, wrapped })
    }

    /// Serialize to the 800-byte wire form
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(KEM_PAYLOAD_SIZE);
        bytes.extend_from_slice(&self.kem_ct);
        bytes.extend_from_slice(&self.wrapped);
        bytes
    }

    /// Encode as base64 for JSON edges
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }

    /// Decode from base64
    pub fn from_base64(s: &str) -> Result<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| CryptoError::BadPayload(format!("payload base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for KemPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KemPayload({} bytes)", KEM_PAYLOAD_SIZE)
    }
}

/// Wrap a DEK for a recipient (sender side).
///
/// Performs a fresh ML-KEM-512 encapsulation against the recipient's public
/// key and XORs the DEK with the resulting shared secret. Two wraps of the
/// same DEK for the same recipient produce different payloads because the
/// encapsulation randomness differs.
pub fn wrap_dek(recipient: &KyberPublicKey, dek: &Dek) -> Result<KemPayload> {
    let (kem_ct, ss) = kyber_encapsulate(recipient.as_bytes(), &mut KemRng)
        .map_err(|e| CryptoError::Encryption(format!("encapsulation failed: {e:?}")))?;
    let ss = SharedSecret(ss);

    let mut wrapped = [0u8; DEK_SIZE];
    for (i, w) in wrapped.iter_mut().enumerate() {
        *w = dek.as_bytes()[i] ^ ss.0[i];
    }

    Ok(KemPayload { kem_ct, wrapped })
}

/// Unwrap a DEK (recipient side).
///
/// Decapsulates the KEM ciphertext with the recipient's secret key and XORs
/// the wrapped half back into the DEK. ML-KEM decapsulation is
/// implicit-rejection: a wrong secret key yields a different shared secret
/// (and therefore a wrong DEK) rather than an error; the mismatch surfaces
/// at the GCM tag check downstream.
pub fn unwrap_dek(payload: &KemPayload, secret: &KyberSecretKey) -> Result<Dek> {
    let ss = kyber_decapsulate(&payload.kem_ct, secret.as_bytes())
        .map_err(|e| CryptoError::BadPayload(format!("decapsulation failed: {e:?}")))?;
    let ss = SharedSecret(ss);

    let mut buf = [0u8; DEK_SIZE];
    for (i, d) in buf.iter_mut().enumerate() {
        *d = payload.wrapped[i] ^ ss.0[i];
    }
    let dek = Dek::from_bytes(&buf)?;
    buf.zeroize();

    Ok(dek)
}
