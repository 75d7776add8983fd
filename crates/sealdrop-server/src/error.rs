//! API error type and the stable error taxonomy

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Stable error kinds exposed to clients for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    BadCredentials,
    AlreadyExists,
    BadKey,
    NoRecipientKey,
    BadPayload,
    Tampered,
    SizeMismatch,
    FingerprintMismatch,
    WeakPassword,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    /// Get the kind name as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "NotFound",
            Self::BadCredentials => "BadCredentials",
            Self::AlreadyExists => "AlreadyExists",
            Self::BadKey => "BadKey",
            Self::NoRecipientKey => "NoRecipientKey",
            Self::BadPayload => "BadPayload",
            Self::Tampered => "Tampered",
            Self::SizeMismatch => "SizeMismatch",
            Self::FingerprintMismatch => "FingerprintMismatch",
            Self::WeakPassword => "WeakPassword",
            Self::InvalidInput => "InvalidInput",
            Self::Internal => "Internal",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::BadCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists | Self::NoRecipientKey => StatusCode::CONFLICT,
            Self::BadKey
            | Self::BadPayload
            | Self::Tampered
            | Self::SizeMismatch
            | Self::FingerprintMismatch
            | Self::WeakPassword
            | Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Api { kind: ErrorKind, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] sealdrop_crypto::CryptoError),
}

impl ApiError {
    /// Create an error with an explicit kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Api {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Get the taxonomy kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { kind, .. } => *kind,
            Self::Database(_) | Self::Storage(_) => ErrorKind::Internal,
            Self::Crypto(e) => match e {
                sealdrop_crypto::CryptoError::BadKey(_) => ErrorKind::BadKey,
                sealdrop_crypto::CryptoError::BadPayload(_) => ErrorKind::BadPayload,
                sealdrop_crypto::CryptoError::Tampered => ErrorKind::Tampered,
                sealdrop_crypto::CryptoError::DataTooLarge { .. } => ErrorKind::InvalidInput,
                _ => ErrorKind::Internal,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.status_code();

        // Internal failure details stay in the log, not on the wire
        let message = if kind == ErrorKind::Internal {
            tracing::error!(error = %self, "internal server error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": message,
            "kind": kind.as_str(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_status_mapping() {
        assert_eq!(ErrorKind::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::BadCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::AlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::SizeMismatch.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_crypto_error_kinds() {
        let err = ApiError::from(sealdrop_crypto::CryptoError::Tampered);
        assert_eq!(err.kind(), ErrorKind::Tampered);

        let err = ApiError::from(sealdrop_crypto::CryptoError::BadPayload("short".into()));
        assert_eq!(err.kind(), ErrorKind::BadPayload);
    }
}
