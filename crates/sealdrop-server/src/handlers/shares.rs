//! Direct-share ledger handlers

use crate::auth::generate_share_code;
use crate::db::is_unique_violation;
use crate::models::*;
use crate::state::{AppState, AuthIdentity};
use crate::{ApiError, ErrorKind};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sealdrop_crypto::KemPayload;
use std::sync::Arc;

const PERMISSIONS: &[&str] = &["view", "download", "full"];
const CODE_RETRIES: usize = 8;

/// POST /api/shares
///
/// Records a (recipient, wrapped payload) tuple for a file the caller owns.
/// No precondition failure leaves a partial record.
pub async fn create_share(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Json(req): Json<CreateShareRequest>,
) -> Result<(StatusCode, Json<ShareResponse>), ApiError> {
    let permission = req.permission.as_deref().unwrap_or("download");
    if !PERMISSIONS.contains(&permission) {
        return Err(ApiError::invalid("permission must be view, download, or full"));
    }

    let payload = KemPayload::from_base64(&req.payload)
        .map_err(|e| ApiError::new(ErrorKind::BadPayload, e.to_string()))?;

    let file = state
        .db
        .file_by_id(req.file_id)
        .await?
        .filter(|f| f.owner_id == caller.id)
        .ok_or_else(|| ApiError::not_found("file not found"))?;

    let recipient = state
        .db
        .identity_by_researcher_id(req.recipient_id.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("recipient not found"))?;

    if recipient.kyber_public_key.is_none() {
        return Err(ApiError::new(
            ErrorKind::NoRecipientKey,
            "recipient has no public key registered",
        ));
    }

    // Share codes are DB-unique; collisions draw a fresh code and retry
    let mut share = None;
    for _ in 0..CODE_RETRIES {
        let code = generate_share_code()?;
        match state
            .db
            .insert_share(
                file.id,
                caller.id,
                recipient.id,
                &payload.to_bytes(),
                &code,
                permission,
            )
            .await
        {
            Ok(row) => {
                share = Some(row);
                break;
            }
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let share = share.ok_or_else(|| {
        ApiError::new(ErrorKind::Internal, "could not allocate a unique share code")
    })?;

    tracing::info!(share_id = share.id, file_id = file.id, "direct share created");

    let detail = state
        .db
        .active_share_by_code(&share.share_code)
        .await?
        .ok_or_else(|| ApiError::new(ErrorKind::Internal, "share vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(ShareResponse::from(&detail))))
}

/// GET /api/shares/code/{shareCode}
///
/// Returns the wrapped payload to the addressed recipient only; the first
/// fetch by the recipient flips the viewed flag, later fetches are
/// idempotent. Revoked codes resolve to nothing for every caller.
pub async fn fetch_by_code(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(code): Path<String>,
) -> Result<Json<ShareResponse>, ApiError> {
    let share = state
        .db
        .active_share_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::not_found("share not found"))?;

    if share.recipient_id != caller.id {
        return Err(ApiError::forbidden("share is not addressed to you"));
    }

    if !share.viewed {
        state.db.mark_share_viewed(share.id).await?;
    }

    let mut response = ShareResponse::from(&share);
    response.viewed = true;
    Ok(Json(response))
}

/// GET /api/shares/outgoing
pub async fn list_outgoing(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
) -> Result<Json<Vec<ShareResponse>>, ApiError> {
    let shares = state.db.outgoing_shares(caller.id).await?;
    Ok(Json(shares.iter().map(ShareResponse::from).collect()))
}

/// GET /api/shares/incoming
///
/// Active records addressed to the caller: direct shares plus group shares
/// where the caller is a current member holding a payload entry.
pub async fn list_incoming(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
) -> Result<Json<Vec<IncomingShare>>, ApiError> {
    let direct = state.db.incoming_shares(caller.id).await?;
    let group = state.db.group_shares_for_identity(caller.id).await?;

    let mut items: Vec<IncomingShare> = direct
        .iter()
        .map(|s| IncomingShare::Direct(ShareResponse::from(s)))
        .collect();
    items.extend(group.iter().map(|s| IncomingShare::Group(GroupShareResponse::from(s))));

    Ok(Json(items))
}

/// DELETE /api/shares/{shareId}
///
/// Owner-only transition to the terminal revoked state. Subsequent fetches
/// of the code see nothing; payloads already fetched cannot be rescinded.
pub async fn revoke_share(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(share_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let share = state
        .db
        .share_by_id(share_id)
        .await?
        .filter(|s| s.sender_id == caller.id)
        .ok_or_else(|| ApiError::not_found("share not found"))?;

    state.db.revoke_share(share.id).await?;
    tracing::info!(share_id, "share revoked");

    Ok(Json(serde_json::json!({ "message": "access revoked" })))
}
