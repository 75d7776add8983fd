//! AES-256-GCM payload sealing and the blob wire format
//!
//! A sealed blob is `IV (12) ∥ ciphertext ∥ tag (16)` with no header, length
//! prefix, or magic bytes. The tag is the final 16 bytes. Blob length is
//! always `12 + plaintext-length + 16`; an empty plaintext seals to exactly
//! 28 bytes.

use crate::{
    keys::{Dek, Iv, IV_SIZE},
    CryptoError, Result,
};
use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit};

/// Size of the GCM authentication tag appended to the ciphertext
pub const TAG_SIZE: usize = 16;

fn cipher(dek: &Dek) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(dek.as_bytes()).map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Encrypt a plaintext, producing `ciphertext ∥ tag` (no IV prefix)
pub fn encrypt(dek: &Dek, iv: &Iv, plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = aes_gcm::Nonce::from_slice(iv.as_bytes());
    cipher(dek)?
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypt `ciphertext ∥ tag`.
///
/// A tag-verification failure is `Tampered`; no partial plaintext is
/// returned on any failure path.
pub fn decrypt(dek: &Dek, iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let nonce = aes_gcm::Nonce::from_slice(iv.as_bytes());
    cipher(dek)?
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Tampered)
}

/// Prepend the IV to a `ciphertext ∥ tag` body, forming the wire blob
pub fn assemble_blob(iv: &Iv, ciphertext: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(IV_SIZE + ciphertext.len());
    blob.extend_from_slice(iv.as_bytes());
    blob.extend_from_slice(ciphertext);
    blob
}

/// Split a wire blob into its IV and `ciphertext ∥ tag` parts
pub fn split_blob(blob: &[u8]) -> Result<(Iv, &[u8])> {
    if blob.len() < IV_SIZE + TAG_SIZE {
        return Err(CryptoError::Tampered);
    }
    let iv = Iv::from_bytes(&blob[..IV_SIZE])?;
    Ok((iv, &blob[IV_SIZE..]))
}

/// Decrypt a full wire blob (`IV ∥ ciphertext ∥ tag`)
pub fn open_blob(dek: &Dek, blob: &[u8]) -> Result<Vec<u8>> {
    let (iv, ciphertext) = split_blob(blob)?;
    decrypt(dek, &iv, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dek = Dek::generate().unwrap();
        let iv = Iv::generate().unwrap();
        let plaintext = b"research data";

        let ciphertext = encrypt(&dek, &iv, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);

        let decrypted = decrypt(&dek, &iv, &ciphertext).unwrap();
        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_blob_roundtrip() {
        let dek = Dek::generate().unwrap();
        let iv = Iv::generate().unwrap();
        let plaintext = b"Hi\n";

        let blob = assemble_blob(&iv, &encrypt(&dek, &iv, plaintext).unwrap());
        assert_eq!(blob.len(), 3 + IV_SIZE + TAG_SIZE);

        assert_eq!(open_blob(&dek, &blob).unwrap(), plaintext);
    }

    #[test]
    fn test_empty_plaintext_seals_to_28_bytes() {
        let dek = Dek::generate().unwrap();
        let iv = Iv::generate().unwrap();

        let blob = assemble_blob(&iv, &encrypt(&dek, &iv, b"").unwrap());
        assert_eq!(blob.len(), IV_SIZE + TAG_SIZE);
        assert_eq!(open_blob(&dek, &blob).unwrap(), b"");
    }

    #[test]
    fn test_any_flipped_bit_is_tampered() {
        let dek = Dek::generate().unwrap();
        let iv = Iv::generate().unwrap();
        let blob = assemble_blob(&iv, &encrypt(&dek, &iv, b"integrity matters").unwrap());

        // Flip one bit in every ciphertext-or-tag byte position in turn
        for i in IV_SIZE..blob.len() {
            let mut corrupted = blob.clone();
            corrupted[i] ^= 0x01;
            match open_blob(&dek, &corrupted) {
                Err(CryptoError::Tampered) => {}
                other => panic!("expected Tampered at byte {i}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_wrong_key_is_tampered() {
        let dek = Dek::generate().unwrap();
        let other = Dek::generate().unwrap();
        let iv = Iv::generate().unwrap();
        let blob = assemble_blob(&iv, &encrypt(&dek, &iv, b"secret").unwrap());

        assert!(matches!(open_blob(&other, &blob), Err(CryptoError::Tampered)));
    }

    #[test]
    fn test_truncated_blob_is_rejected() {
        let dek = Dek::generate().unwrap();
        assert!(matches!(open_blob(&dek, &[0u8; 27]), Err(CryptoError::Tampered)));
    }
}
