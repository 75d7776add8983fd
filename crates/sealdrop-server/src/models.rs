//! JSON wire types
//!
//! Binary values cross the HTTP boundary exactly once per direction: public
//! keys and wrapped-key payloads as base64, fingerprints as lowercase hex.
//! Internally everything is typed bytes.

use crate::db::{FileRow, GroupMemberRow, GroupRow, GroupShareDetailRow, IdentityRow, ShareDetailRow};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// ── Identity & Key Registry ───────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub researcher_id: String,
    pub password: String,
    pub kyber_public_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub researcher_id: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub id: i64,
    pub researcher_id: String,
    pub has_public_key: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&IdentityRow> for IdentityResponse {
    fn from(row: &IdentityRow) -> Self {
        Self {
            id: row.id,
            researcher_id: row.researcher_id.clone(),
            has_public_key: row.has_public_key(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub identity: IdentityResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPublicKeyRequest {
    pub kyber_public_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub researcher_id: String,
    pub kyber_public_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: i64,
    pub researcher_id: String,
    pub has_public_key: bool,
}

// ── Blob Store ────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: i64,
    pub owner_id: i64,
    pub file_name: String,
    pub original_size: i64,
    pub encrypted_size: i64,
    pub content_type: String,
    pub sha256_hash: String,
    pub iv: String,
    pub created_at: DateTime<Utc>,
    /// Present only when the caller owns the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_kem_ct: Option<String>,
}

impl FileResponse {
    pub fn for_owner(row: &FileRow) -> Self {
        let mut resp = Self::public_view(row);
        resp.owner_kem_ct = Some(b64(&row.owner_kem_ct));
        resp
    }

    pub fn public_view(row: &FileRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            file_name: row.file_name.clone(),
            original_size: row.original_size,
            encrypted_size: row.encrypted_size,
            content_type: row.content_type.clone(),
            sha256_hash: row.sha256_hash.clone(),
            iv: row.iv.clone(),
            created_at: row.created_at,
            owner_kem_ct: None,
        }
    }
}

// ── Share Ledger ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    pub file_id: i64,
    /// Recipient researcher id
    pub recipient_id: String,
    /// base64 wrapped-key payload (800 bytes decoded)
    pub payload: String,
    pub permission: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub id: i64,
    pub file_id: i64,
    pub file_name: String,
    pub sender_name: String,
    pub recipient_name: String,
    pub share_code: String,
    pub permission: String,
    pub payload: String,
    pub viewed: bool,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub content_type: String,
    pub original_size: i64,
    pub encrypted_size: i64,
    pub sha256_hash: String,
    pub iv: String,
}

impl From<&ShareDetailRow> for ShareResponse {
    fn from(row: &ShareDetailRow) -> Self {
        Self {
            id: row.id,
            file_id: row.file_id,
            file_name: row.file_name.clone(),
            sender_name: row.sender_name.clone(),
            recipient_name: row.recipient_name.clone(),
            share_code: row.share_code.clone(),
            permission: row.permission.clone(),
            payload: b64(&row.payload),
            viewed: row.viewed,
            revoked: row.revoked,
            created_at: row.created_at,
            content_type: row.content_type.clone(),
            original_size: row.original_size,
            encrypted_size: row.encrypted_size,
            sha256_hash: row.sha256_hash.clone(),
            iv: row.iv.clone(),
        }
    }
}

// ── Groups ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub my_role: String,
    pub created_at: DateTime<Utc>,
}

impl GroupResponse {
    pub fn new(row: &GroupRow, my_role: &str) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            owner_id: row.owner_id,
            my_role: my_role.to_string(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberResponse {
    pub identity_id: i64,
    pub researcher_id: String,
    pub role: String,
    pub has_public_key: bool,
    pub joined_at: DateTime<Utc>,
}

impl From<&GroupMemberRow> for GroupMemberResponse {
    fn from(row: &GroupMemberRow) -> Self {
        Self {
            identity_id: row.identity_id,
            researcher_id: row.researcher_id.clone(),
            role: row.role.clone(),
            has_public_key: row.has_public_key,
            joined_at: row.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetailResponse {
    #[serde(flatten)]
    pub group: GroupResponse,
    pub members: Vec<GroupMemberResponse>,
    pub shared_files: Vec<GroupShareResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub researcher_id: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberKeyResponse {
    pub identity_id: i64,
    pub researcher_id: String,
    pub kyber_public_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupShareRequest {
    pub file_id: i64,
    /// member identity id (decimal string) → base64 wrapped-key payload
    pub payloads: std::collections::HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupShareResponse {
    pub id: i64,
    pub file_id: i64,
    pub group_id: i64,
    pub group_name: String,
    pub shared_by: String,
    pub file_name: String,
    pub content_type: String,
    pub original_size: i64,
    pub encrypted_size: i64,
    pub sha256_hash: String,
    pub iv: String,
    /// The caller's wrapped-key payload
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl From<&GroupShareDetailRow> for GroupShareResponse {
    fn from(row: &GroupShareDetailRow) -> Self {
        Self {
            id: row.id,
            file_id: row.file_id,
            group_id: row.group_id,
            group_name: row.group_name.clone(),
            shared_by: row.shared_by_name.clone(),
            file_name: row.file_name.clone(),
            content_type: row.content_type.clone(),
            original_size: row.original_size,
            encrypted_size: row.encrypted_size,
            sha256_hash: row.sha256_hash.clone(),
            iv: row.iv.clone(),
            payload: b64(&row.payload),
            created_at: row.created_at,
        }
    }
}

/// One entry of the merged incoming-shares listing
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IncomingShare {
    #[serde(rename = "direct")]
    Direct(ShareResponse),
    #[serde(rename = "group")]
    Group(GroupShareResponse),
}
