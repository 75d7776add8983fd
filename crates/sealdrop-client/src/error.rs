//! Error types for the sealdrop-client crate

use thiserror::Error;

/// Result type alias using `ClientError`
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur in the client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level HTTP failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the request; `kind` is the stable taxonomy name
    #[error("api error ({kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    /// Cipher engine failure
    #[error(transparent)]
    Crypto(#[from] sealdrop_crypto::CryptoError),

    /// The local keystore has no keypair for this identity. Receiving and
    /// re-sharing need the secret key; restore the keystore or register a
    /// new key (which orphans prior shares).
    #[error("no local keypair for identity '{0}'")]
    NoKeypair(String),

    /// Only the file owner can recover the DEK for re-sharing
    #[error("not the owner of this file")]
    NotOwner,

    /// No session; log in first
    #[error("not authenticated")]
    NotAuthenticated,

    /// Keystore persistence failure
    #[error("keystore error: {0}")]
    Keystore(#[from] std::io::Error),

    /// Malformed JSON from the keystore or the wire
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// The taxonomy kind reported by the server, when this is an API error
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Api { kind, .. } => Some(kind),
            _ => None,
        }
    }
}
