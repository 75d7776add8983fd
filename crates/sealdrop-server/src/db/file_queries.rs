//! File record queries and the read-authorization predicate

use crate::db::Database;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One stored ciphertext blob's metadata
#[derive(Debug, Clone, FromRow)]
pub struct FileRow {
    pub id: i64,
    pub owner_id: i64,
    pub file_name: String,
    pub original_size: i64,
    pub encrypted_size: i64,
    pub content_type: String,
    pub sha256_hash: String,
    pub iv: String,
    pub owner_kem_ct: Vec<u8>,
    pub storage_name: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_file(
        &self,
        owner_id: i64,
        file_name: &str,
        original_size: i64,
        encrypted_size: i64,
        content_type: &str,
        sha256_hash: &str,
        iv: &str,
        owner_kem_ct: &[u8],
        storage_name: &str,
    ) -> Result<FileRow, sqlx::Error> {
        sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO files
                (owner_id, file_name, original_size, encrypted_size, content_type,
                 sha256_hash, iv, owner_kem_ct, storage_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(file_name)
        .bind(original_size)
        .bind(encrypted_size)
        .bind(content_type)
        .bind(sha256_hash)
        .bind(iv)
        .bind(owner_kem_ct)
        .bind(storage_name)
        .bind(Utc::now())
        .fetch_one(&**self)
        .await
    }

    pub async fn file_by_id(&self, id: i64) -> Result<Option<FileRow>, sqlx::Error> {
        sqlx::query_as::<_, FileRow>("SELECT * FROM files WHERE id = ?1")
            .bind(id)
            .fetch_optional(&**self)
            .await
    }

    pub async fn files_by_owner(&self, owner_id: i64) -> Result<Vec<FileRow>, sqlx::Error> {
        sqlx::query_as::<_, FileRow>(
            "SELECT * FROM files WHERE owner_id = ?1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&**self)
        .await
    }

    /// Delete a file record; foreign keys cascade to direct shares, group
    /// shares, and fan-out keys in the same transaction.
    pub async fn delete_file(&self, id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM files WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    /// May `caller` read this blob? True iff the caller owns the file, holds
    /// an active direct share for it, or is a current member of a group with
    /// a group share for it. Group membership is evaluated at read time.
    pub async fn authorize_read(&self, file_id: i64, caller: i64) -> Result<bool, sqlx::Error> {
        let authorized: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM files WHERE id = ?1 AND owner_id = ?2)
                OR EXISTS (SELECT 1 FROM shares
                           WHERE file_id = ?1 AND recipient_id = ?2 AND revoked = 0)
                OR EXISTS (SELECT 1 FROM group_shares gs
                           JOIN group_members gm ON gm.group_id = gs.group_id
                           WHERE gs.file_id = ?1 AND gm.identity_id = ?2)
            "#,
        )
        .bind(file_id)
        .bind(caller)
        .fetch_one(&**self)
        .await?;

        Ok(authorized != 0)
    }
}
