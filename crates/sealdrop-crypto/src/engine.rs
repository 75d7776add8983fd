//! The encrypt/share/decrypt pipelines
//!
//! Each pipeline is a strict sequence of phases that either completes or
//! fails as a unit; no phase is suspended mid-computation. Progress is
//! reported through a callback side channel so callers can surface it
//! without the pipeline awaiting anything.
//!
//! Upload phase order:
//!
//! ```text
//! Idle → KeyDraw → IvDraw → Encrypt → Hash → OwnerWrap → Upload → Done
//!                                                              ↘ Failed
//! ```
//!
//! The `Upload` and terminal phases belong to the network layer; this
//! module emits up to `OwnerWrap`.

use crate::{
    hashing::Fingerprint,
    kem::{self, KemPayload, KyberPublicKey, KyberSecretKey},
    keys::{Dek, Iv},
    symmetric, CryptoError, Result, MAX_PLAINTEXT_SIZE,
};

/// Phases of the encrypt-and-upload pipeline, reported via the progress
/// callback as each transition is taken
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    KeyDraw,
    IvDraw,
    Encrypt,
    Hash,
    OwnerWrap,
    Upload,
    Done,
    Failed,
}

/// Everything the uploader hands to the server for one file
pub struct EncryptedUpload {
    /// The sealed wire blob: `IV ∥ ciphertext ∥ tag`
    pub blob: Vec<u8>,
    /// The IV, duplicated out of the blob for the metadata side channel
    pub iv: Iv,
    /// SHA-256 over the ciphertext-and-tag portion of the blob
    pub fingerprint: Fingerprint,
    /// Plaintext length before sealing
    pub original_size: u64,
    /// The owner's own wrapped-key payload, kept so the owner can re-share
    pub owner_wrap: KemPayload,
}

/// Seal a plaintext and wrap the DEK for the owner (uploader side).
///
/// Validation happens before any key material is drawn; an oversized
/// plaintext is rejected without touching the RNG. The DEK is wiped when
/// the pipeline returns, on success and failure alike.
pub fn encrypt_and_wrap(
    owner: &KyberPublicKey,
    plaintext: &[u8],
    mut on_phase: impl FnMut(UploadPhase),
) -> Result<EncryptedUpload> {
    if plaintext.len() > MAX_PLAINTEXT_SIZE {
        return Err(CryptoError::DataTooLarge {
            size: plaintext.len() as u64,
            max: MAX_PLAINTEXT_SIZE as u64,
        });
    }

    on_phase(UploadPhase::KeyDraw);
    let dek = Dek::generate()?;

    on_phase(UploadPhase::IvDraw);
    let iv = Iv::generate()?;

    on_phase(UploadPhase::Encrypt);
    let ciphertext = symmetric::encrypt(&dek, &iv, plaintext)?;

    on_phase(UploadPhase::Hash);
    let fingerprint = Fingerprint::digest(&ciphertext);

    on_phase(UploadPhase::OwnerWrap);
    let owner_wrap = kem::wrap_dek(owner, &dek)?;

    Ok(EncryptedUpload {
        blob: symmetric::assemble_blob(&iv, &ciphertext),
        iv,
        fingerprint,
        original_size: plaintext.len() as u64,
        owner_wrap,
    })
}

/// Re-wrap a file's DEK for another recipient (sender side).
///
/// Recovers the DEK from the sender's own wrap and performs a fresh
/// encapsulation against the recipient's public key. Payloads differ on
/// every call even for the same recipient and DEK.
pub fn rewrap_for_recipient(
    sender_secret: &KyberSecretKey,
    owner_wrap: &KemPayload,
    recipient: &KyberPublicKey,
) -> Result<KemPayload> {
    let dek = kem::unwrap_dek(owner_wrap, sender_secret)?;
    kem::wrap_dek(recipient, &dek)
}

/// Unwrap a received payload and open the blob (recipient side).
///
/// When a server-supplied fingerprint is present it is checked against the
/// ciphertext before decryption; a mismatch is `Tampered` and fatal. A GCM
/// tag failure likewise returns `Tampered` with no plaintext bytes.
pub fn decrypt_and_unwrap(
    recipient_secret: &KyberSecretKey,
    payload: &KemPayload,
    blob: &[u8],
    expected_fingerprint: Option<&Fingerprint>,
) -> Result<Vec<u8>> {
    let (_, ciphertext) = symmetric::split_blob(blob)?;
    if let Some(expected) = expected_fingerprint {
        expected.verify(ciphertext)?;
    }

    let dek = kem::unwrap_dek(payload, recipient_secret)?;
    symmetric::open_blob(&dek, blob)
}
