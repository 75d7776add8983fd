//! Group and group-share handlers
//!
//! Group fan-out is all-or-nothing: every member named in the payload
//! mapping must be a current member with a registered public key, every
//! payload must be well-formed, and the whole set commits in one
//! transaction. Members absent from the mapping simply have no access.

use crate::db::is_unique_violation;
use crate::models::*;
use crate::state::{AppState, AuthIdentity};
use crate::{ApiError, ErrorKind};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use base64::Engine;
use sealdrop_crypto::KemPayload;
use std::sync::Arc;

const ROLES: &[&str] = &["admin", "member"];

/// May this member administer the group (add/remove members, share files)?
fn is_admin(role: &str) -> bool {
    role == "admin" || role == "owner"
}

async fn require_membership(
    state: &AppState,
    group_id: i64,
    identity_id: i64,
) -> Result<crate::db::GroupMemberRow, ApiError> {
    state
        .db
        .group_membership(group_id, identity_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("you are not a member of this group"))
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupResponse>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid("group name is required"));
    }
    if name.len() > 200 {
        return Err(ApiError::invalid("group name too long (max 200 chars)"));
    }

    let group = state
        .db
        .create_group(name, req.description.as_deref().unwrap_or("").trim(), caller.id)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::new(ErrorKind::AlreadyExists, "group name already exists")
            } else {
                e.into()
            }
        })?;

    tracing::info!(group_id = group.id, "group created");
    Ok((StatusCode::CREATED, Json(GroupResponse::new(&group, "owner"))))
}

/// GET /api/groups
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
) -> Result<Json<Vec<GroupResponse>>, ApiError> {
    let groups = state.db.groups_for_identity(caller.id).await?;
    Ok(Json(
        groups
            .iter()
            .map(|(group, role)| GroupResponse::new(group, role))
            .collect(),
    ))
}

/// GET /api/groups/{groupId}
pub async fn group_detail(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(group_id): Path<i64>,
) -> Result<Json<GroupDetailResponse>, ApiError> {
    let group = state
        .db
        .group_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("group not found"))?;
    let membership = require_membership(&state, group_id, caller.id).await?;

    let members = state.db.group_members(group_id).await?;
    let shares = state.db.group_shares_in_group(group_id, caller.id).await?;

    Ok(Json(GroupDetailResponse {
        group: GroupResponse::new(&group, &membership.role),
        members: members.iter().map(GroupMemberResponse::from).collect(),
        shared_files: shares.iter().map(GroupShareResponse::from).collect(),
    }))
}

/// POST /api/groups/{groupId}/members
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(group_id): Path<i64>,
    Json(req): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<GroupMemberResponse>), ApiError> {
    state
        .db
        .group_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("group not found"))?;

    let membership = require_membership(&state, group_id, caller.id).await?;
    if !is_admin(&membership.role) {
        return Err(ApiError::forbidden("only admins can add members"));
    }

    let role = req.role.as_deref().unwrap_or("member");
    if !ROLES.contains(&role) {
        return Err(ApiError::invalid("role must be admin or member"));
    }

    let target = state
        .db
        .identity_by_researcher_id(req.researcher_id.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("researcher not found"))?;

    state
        .db
        .add_group_member(group_id, target.id, role)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::new(ErrorKind::AlreadyExists, "already a member")
            } else {
                e.into()
            }
        })?;

    let member = state
        .db
        .group_membership(group_id, target.id)
        .await?
        .ok_or_else(|| ApiError::new(ErrorKind::Internal, "membership vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(GroupMemberResponse::from(&member))))
}

/// DELETE /api/groups/{groupId}/members/{identityId}
///
/// Admins remove anyone but the owner; anyone may remove themselves.
/// Removal stops future reads of group-shared files; payloads the member
/// already fetched are beyond recall.
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path((group_id, identity_id)): Path<(i64, i64)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let group = state
        .db
        .group_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("group not found"))?;

    if identity_id == group.owner_id {
        return Err(ApiError::invalid("cannot remove the group owner"));
    }

    if identity_id != caller.id {
        let membership = require_membership(&state, group_id, caller.id).await?;
        if !is_admin(&membership.role) {
            return Err(ApiError::forbidden("only admins can remove members"));
        }
    }

    if !state.db.remove_group_member(group_id, identity_id).await? {
        return Err(ApiError::not_found("member not found"));
    }

    Ok(Json(serde_json::json!({ "message": "member removed" })))
}

/// GET /api/groups/{groupId}/public-keys
///
/// Every current member's registered public key, for one-round fan-out
/// encapsulation by the sender.
pub async fn member_public_keys(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(group_id): Path<i64>,
) -> Result<Json<Vec<MemberKeyResponse>>, ApiError> {
    state
        .db
        .group_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("group not found"))?;
    require_membership(&state, group_id, caller.id).await?;

    let keys = state.db.group_member_keys(group_id).await?;
    Ok(Json(
        keys.iter()
            .map(|row| MemberKeyResponse {
                identity_id: row.identity_id,
                researcher_id: row.researcher_id.clone(),
                kyber_public_key: base64::engine::general_purpose::STANDARD
                    .encode(&row.kyber_public_key),
            })
            .collect(),
    ))
}

/// POST /api/groups/{groupId}/shares
pub async fn create_group_share(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(group_id): Path<i64>,
    Json(req): Json<CreateGroupShareRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    state
        .db
        .group_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("group not found"))?;

    let membership = require_membership(&state, group_id, caller.id).await?;
    if !is_admin(&membership.role) {
        return Err(ApiError::forbidden("only group admins can share files"));
    }

    state
        .db
        .file_by_id(req.file_id)
        .await?
        .filter(|f| f.owner_id == caller.id)
        .ok_or_else(|| ApiError::not_found("file not found"))?;

    if req.payloads.is_empty() {
        return Err(ApiError::invalid("payloads must not be empty"));
    }

    // Validate the whole mapping before anything is written
    let mut entries = Vec::with_capacity(req.payloads.len());
    for (member_key, payload_b64) in &req.payloads {
        let member_id: i64 = member_key
            .parse()
            .map_err(|_| ApiError::invalid("payload keys must be member identity ids"))?;

        let member = state
            .db
            .group_membership(group_id, member_id)
            .await?
            .ok_or_else(|| {
                ApiError::invalid(format!("identity {member_id} is not a group member"))
            })?;
        if !member.has_public_key {
            return Err(ApiError::new(
                ErrorKind::NoRecipientKey,
                format!("member {} has no public key registered", member.researcher_id),
            ));
        }

        let payload = KemPayload::from_base64(payload_b64)
            .map_err(|e| ApiError::new(ErrorKind::BadPayload, e.to_string()))?;
        entries.push((member_id, payload.to_bytes()));
    }

    let share_id = state
        .db
        .upsert_group_share(req.file_id, group_id, caller.id, &entries)
        .await?;

    tracing::info!(group_id, file_id = req.file_id, members = entries.len(), "group share created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": share_id, "fileId": req.file_id, "groupId": group_id })),
    ))
}

/// GET /api/groups/shares
pub async fn list_group_shares(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
) -> Result<Json<Vec<GroupShareResponse>>, ApiError> {
    let shares = state.db.group_shares_for_identity(caller.id).await?;
    Ok(Json(shares.iter().map(GroupShareResponse::from).collect()))
}

/// DELETE /api/groups/{groupId}
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(group_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let group = state
        .db
        .group_by_id(group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("group not found"))?;

    if group.owner_id != caller.id {
        return Err(ApiError::forbidden("only the owner can delete this group"));
    }

    state.db.delete_group(group_id).await?;
    Ok(Json(serde_json::json!({ "message": "group deleted" })))
}
