//! Password verifiers and session tokens

use crate::{ApiError, ErrorKind};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// A syntactically valid verifier that matches no password. Unknown
/// identifiers are verified against this so the login failure path does the
/// same work as a wrong password.
const DUMMY_VERIFIER: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hash a password into a PHC-format verifier string
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::new(ErrorKind::Internal, format!("password hashing failed: {e}")))
}

/// Verify a password against a stored verifier (or the dummy when the
/// identifier is unknown)
pub fn verify_password(password: &str, verifier: Option<&str>) -> bool {
    let verifier = verifier.unwrap_or(DUMMY_VERIFIER);
    let Ok(parsed) = PasswordHash::new(verifier) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Mint an opaque bearer token: 32 random bytes, hex-encoded
pub fn generate_token() -> Result<String, ApiError> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| ApiError::new(ErrorKind::Internal, format!("rng failure: {e}")))?;
    Ok(hex::encode(bytes))
}

/// Generate a 6-hex-char share code. A lookup handle, not a secret: the
/// wrapped payload behind it is useless without the recipient's secret key.
pub fn generate_share_code() -> Result<String, ApiError> {
    let mut bytes = [0u8; 3];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| ApiError::new(ErrorKind::Internal, format!("rng failure: {e}")))?;
    Ok(hex::encode(bytes))
}

/// Pull the bearer token out of an Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}
