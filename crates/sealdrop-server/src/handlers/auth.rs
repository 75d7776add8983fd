//! Identity & key registry handlers

use crate::auth::{generate_token, hash_password, verify_password};
use crate::db::is_unique_violation;
use crate::models::*;
use crate::state::{AppState, AuthIdentity};
use crate::{ApiError, ErrorKind};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{Duration, Utc};
use sealdrop_crypto::KyberPublicKey;
use serde::Deserialize;
use std::sync::Arc;

/// Decode and length-check a base64 public key from the wire
fn decode_public_key(b64: &str) -> Result<KyberPublicKey, ApiError> {
    KyberPublicKey::from_base64(b64)
        .map_err(|e| ApiError::new(ErrorKind::BadKey, e.to_string()))
}

async fn open_session(
    state: &AppState,
    identity_id: i64,
) -> Result<String, ApiError> {
    let token = generate_token()?;
    let expires_at = Utc::now() + Duration::seconds(state.config.session_ttl_secs);
    state.db.create_session(&token, identity_id, expires_at).await?;
    Ok(token)
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let researcher_id = req.researcher_id.trim();
    let password = req.password.trim();

    if researcher_id.is_empty() || password.is_empty() {
        return Err(ApiError::invalid("researcher id and password are required"));
    }
    if researcher_id.len() > 64 {
        return Err(ApiError::invalid("researcher id too long (max 64 chars)"));
    }
    if password.len() < state.config.min_password_len {
        return Err(ApiError::new(
            ErrorKind::WeakPassword,
            format!(
                "password must be at least {} characters",
                state.config.min_password_len
            ),
        ));
    }

    let public_key = req
        .kyber_public_key
        .as_deref()
        .map(decode_public_key)
        .transpose()?;

    let verifier = hash_password(password)?;
    let identity = state
        .db
        .create_identity(
            researcher_id,
            &verifier,
            public_key.as_ref().map(|k| k.as_bytes().as_slice()),
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::new(ErrorKind::AlreadyExists, "researcher id already exists")
            } else {
                e.into()
            }
        })?;

    let token = open_session(&state, identity.id).await?;
    tracing::info!(researcher_id = %identity.researcher_id, "identity registered");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            identity: IdentityResponse::from(&identity),
        }),
    ))
}

/// POST /api/auth/login
///
/// Unknown identifier and wrong password take the same path: both verify
/// against a hash (the dummy one for unknown ids) and return the same error.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let researcher_id = req.researcher_id.trim();
    let password = req.password.trim();

    let identity = state.db.identity_by_researcher_id(researcher_id).await?;
    let verified = verify_password(password, identity.as_ref().map(|i| i.password_hash.as_str()));

    let identity = match identity {
        Some(identity) if verified => identity,
        _ => return Err(ApiError::new(ErrorKind::BadCredentials, "invalid credentials")),
    };

    let token = open_session(&state, identity.id).await?;

    Ok(Json(SessionResponse {
        token,
        identity: IdentityResponse::from(&identity),
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.db.delete_session(&caller.token).await?;
    state.evict_session(&caller.token);
    Ok(Json(serde_json::json!({ "message": "logged out" })))
}

/// GET /api/auth/session
pub async fn session(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let identity = state
        .db
        .identity_by_id(caller.id)
        .await?
        .ok_or_else(|| ApiError::not_found("identity not found"))?;
    Ok(Json(IdentityResponse::from(&identity)))
}

/// PUT /api/auth/public-key
pub async fn set_public_key(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Json(req): Json<SetPublicKeyRequest>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let key = decode_public_key(&req.kyber_public_key)?;
    state.db.set_public_key(caller.id, key.as_bytes()).await?;

    let identity = state
        .db
        .identity_by_id(caller.id)
        .await?
        .ok_or_else(|| ApiError::not_found("identity not found"))?;
    Ok(Json(IdentityResponse::from(&identity)))
}

/// GET /api/auth/public-key/{researcherId}
///
/// Returns the stored key or `NotFound`; leaks only that the identifier
/// exists. The messages differ so senders can tell "no such user" from
/// "no key yet".
pub async fn lookup_public_key(
    State(state): State<Arc<AppState>>,
    Path(researcher_id): Path<String>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    let identity = state
        .db
        .identity_by_researcher_id(&researcher_id)
        .await?
        .ok_or_else(|| ApiError::not_found("researcher not found"))?;

    let key = identity
        .kyber_public_key
        .as_deref()
        .ok_or_else(|| ApiError::not_found("researcher has no public key registered"))?;

    use base64::Engine;
    Ok(Json(PublicKeyResponse {
        researcher_id: identity.researcher_id,
        kyber_public_key: base64::engine::general_purpose::STANDARD.encode(key),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// GET /api/auth/search?q=<prefix>
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let prefix = params.q.unwrap_or_default();
    if prefix.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let hits = state
        .db
        .search_identities(&prefix, caller.id, state.config.search_limit)
        .await?
        .iter()
        .map(|row| SearchHit {
            id: row.id,
            researcher_id: row.researcher_id.clone(),
            has_public_key: row.has_public_key(),
        })
        .collect();

    Ok(Json(hits))
}
