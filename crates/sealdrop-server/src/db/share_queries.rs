//! Direct-share ledger queries

use crate::db::Database;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One direct share record
#[derive(Debug, Clone, FromRow)]
pub struct ShareRow {
    pub id: i64,
    pub file_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub payload: Vec<u8>,
    pub share_code: String,
    pub permission: String,
    pub viewed: bool,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// A share joined with its file metadata and the participants' names
#[derive(Debug, Clone, FromRow)]
pub struct ShareDetailRow {
    pub id: i64,
    pub file_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub payload: Vec<u8>,
    pub share_code: String,
    pub permission: String,
    pub viewed: bool,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub file_name: String,
    pub content_type: String,
    pub original_size: i64,
    pub encrypted_size: i64,
    pub sha256_hash: String,
    pub iv: String,
    pub sender_name: String,
    pub recipient_name: String,
}

const SHARE_DETAIL_SELECT: &str = r#"
    SELECT s.id, s.file_id, s.sender_id, s.recipient_id, s.payload, s.share_code,
           s.permission, s.viewed, s.revoked, s.created_at,
           f.file_name, f.content_type, f.original_size, f.encrypted_size,
           f.sha256_hash, f.iv,
           snd.researcher_id AS sender_name,
           rcv.researcher_id AS recipient_name
    FROM shares s
    JOIN files f ON f.id = s.file_id
    JOIN identities snd ON snd.id = s.sender_id
    JOIN identities rcv ON rcv.id = s.recipient_id
"#;

impl Database {
    /// Insert a direct share. The share code carries a UNIQUE constraint;
    /// the caller retries with a fresh code on collision.
    pub async fn insert_share(
        &self,
        file_id: i64,
        sender_id: i64,
        recipient_id: i64,
        payload: &[u8],
        share_code: &str,
        permission: &str,
    ) -> Result<ShareRow, sqlx::Error> {
        sqlx::query_as::<_, ShareRow>(
            r#"
            INSERT INTO shares (file_id, sender_id, recipient_id, payload, share_code,
                                permission, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING *
            "#,
        )
        .bind(file_id)
        .bind(sender_id)
        .bind(recipient_id)
        .bind(payload)
        .bind(share_code)
        .bind(permission)
        .bind(Utc::now())
        .fetch_one(&**self)
        .await
    }

    pub async fn share_by_id(&self, id: i64) -> Result<Option<ShareRow>, sqlx::Error> {
        sqlx::query_as::<_, ShareRow>("SELECT * FROM shares WHERE id = ?1")
            .bind(id)
            .fetch_optional(&**self)
            .await
    }

    /// Look up an active share by its code; revoked records never resolve
    pub async fn active_share_by_code(
        &self,
        code: &str,
    ) -> Result<Option<ShareDetailRow>, sqlx::Error> {
        let sql = format!("{SHARE_DETAIL_SELECT} WHERE s.share_code = ?1 AND s.revoked = 0");
        sqlx::query_as::<_, ShareDetailRow>(&sql)
            .bind(code)
            .fetch_optional(&**self)
            .await
    }

    /// Flip the viewed flag; idempotent once set
    pub async fn mark_share_viewed(&self, share_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE shares SET viewed = 1 WHERE id = ?1")
            .bind(share_id)
            .execute(&**self)
            .await?;
        Ok(())
    }

    /// Every share the sender has created, revoked ones included
    pub async fn outgoing_shares(&self, sender_id: i64) -> Result<Vec<ShareDetailRow>, sqlx::Error> {
        let sql = format!("{SHARE_DETAIL_SELECT} WHERE s.sender_id = ?1 ORDER BY s.created_at DESC");
        sqlx::query_as::<_, ShareDetailRow>(&sql)
            .bind(sender_id)
            .fetch_all(&**self)
            .await
    }

    /// Active shares addressed to the recipient
    pub async fn incoming_shares(
        &self,
        recipient_id: i64,
    ) -> Result<Vec<ShareDetailRow>, sqlx::Error> {
        let sql = format!(
            "{SHARE_DETAIL_SELECT} WHERE s.recipient_id = ?1 AND s.revoked = 0 ORDER BY s.created_at DESC"
        );
        sqlx::query_as::<_, ShareDetailRow>(&sql)
            .bind(recipient_id)
            .fetch_all(&**self)
            .await
    }

    /// Transition a share to its terminal revoked state
    pub async fn revoke_share(&self, share_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE shares SET revoked = 1 WHERE id = ?1")
            .bind(share_id)
            .execute(&**self)
            .await?;
        Ok(())
    }
}
