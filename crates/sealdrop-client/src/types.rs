//! Wire types mirroring the server's JSON surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i64,
    pub researcher_id: String,
    pub has_public_key: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub identity: Identity,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyEntry {
    pub researcher_id: String,
    pub kyber_public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: i64,
    pub researcher_id: String,
    pub has_public_key: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
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
    #[serde(default)]
    pub owner_kem_ct: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
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

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub my_role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub identity_id: i64,
    pub researcher_id: String,
    pub role: String,
    pub has_public_key: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: GroupRecord,
    pub members: Vec<GroupMember>,
    pub shared_files: Vec<GroupShareRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberKey {
    pub identity_id: i64,
    pub researcher_id: String,
    pub kyber_public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupShareRecord {
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

/// One entry of the merged incoming-shares listing
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IncomingShare {
    #[serde(rename = "direct")]
    Direct(ShareRecord),
    #[serde(rename = "group")]
    Group(GroupShareRecord),
}

// ── Request bodies ────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub researcher_id: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyber_public_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub researcher_id: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest<'a> {
    pub file_id: i64,
    pub recipient_id: &'a str,
    pub payload: String,
    pub permission: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest<'a> {
    pub researcher_id: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupShareRequest {
    pub file_id: i64,
    pub payloads: HashMap<String, String>,
}
