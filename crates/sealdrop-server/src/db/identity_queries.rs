//! Identity and session queries

use crate::db::Database;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One researcher account
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRow {
    pub id: i64,
    pub researcher_id: String,
    pub password_hash: String,
    pub kyber_public_key: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl IdentityRow {
    pub fn has_public_key(&self) -> bool {
        self.kyber_public_key.is_some()
    }
}

impl Database {
    /// Insert a new identity; a UNIQUE violation means the id is taken
    pub async fn create_identity(
        &self,
        researcher_id: &str,
        password_hash: &str,
        kyber_public_key: Option<&[u8]>,
    ) -> Result<IdentityRow, sqlx::Error> {
        sqlx::query_as::<_, IdentityRow>(
            r#"
            INSERT INTO identities (researcher_id, password_hash, kyber_public_key, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(researcher_id)
        .bind(password_hash)
        .bind(kyber_public_key)
        .bind(Utc::now())
        .fetch_one(&**self)
        .await
    }

    pub async fn identity_by_researcher_id(
        &self,
        researcher_id: &str,
    ) -> Result<Option<IdentityRow>, sqlx::Error> {
        sqlx::query_as::<_, IdentityRow>("SELECT * FROM identities WHERE researcher_id = ?1")
            .bind(researcher_id)
            .fetch_optional(&**self)
            .await
    }

    pub async fn identity_by_id(&self, id: i64) -> Result<Option<IdentityRow>, sqlx::Error> {
        sqlx::query_as::<_, IdentityRow>("SELECT * FROM identities WHERE id = ?1")
            .bind(id)
            .fetch_optional(&**self)
            .await
    }

    /// Overwrite the stored public key for an identity
    pub async fn set_public_key(&self, identity_id: i64, key: &[u8]) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE identities SET kyber_public_key = ?1 WHERE id = ?2")
            .bind(key)
            .bind(identity_id)
            .execute(&**self)
            .await?;
        Ok(())
    }

    /// Case-sensitive prefix search over researcher ids, excluding the caller.
    ///
    /// `substr` comparison sidesteps SQLite's case-insensitive ASCII LIKE.
    pub async fn search_identities(
        &self,
        prefix: &str,
        exclude_id: i64,
        limit: i64,
    ) -> Result<Vec<IdentityRow>, sqlx::Error> {
        sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT * FROM identities
            WHERE substr(researcher_id, 1, length(?1)) = ?1 AND id != ?2
            ORDER BY researcher_id
            LIMIT ?3
            "#,
        )
        .bind(prefix)
        .bind(exclude_id)
        .bind(limit)
        .fetch_all(&**self)
        .await
    }

    /// Record a fresh session token
    pub async fn create_session(
        &self,
        token: &str,
        identity_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (token, identity_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(token)
        .bind(identity_id)
        .bind(Utc::now())
        .bind(expires_at)
        .execute(&**self)
        .await?;
        Ok(())
    }

    /// Resolve a token to its identity and the session's expiry. An expired
    /// session is deleted on sight and resolves to `None`.
    pub async fn identity_for_session(
        &self,
        token: &str,
    ) -> Result<Option<(IdentityRow, DateTime<Utc>)>, sqlx::Error> {
        #[derive(FromRow)]
        struct SessionHit {
            expires_at: DateTime<Utc>,
            #[sqlx(flatten)]
            identity: IdentityRow,
        }

        let hit = sqlx::query_as::<_, SessionHit>(
            r#"
            SELECT s.expires_at, i.*
            FROM sessions s
            JOIN identities i ON i.id = s.identity_id
            WHERE s.token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&**self)
        .await?;

        match hit {
            Some(hit) if hit.expires_at > Utc::now() => Ok(Some((hit.identity, hit.expires_at))),
            Some(_) => {
                self.delete_session(token).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn delete_session(&self, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sessions WHERE token = ?1")
            .bind(token)
            .execute(&**self)
            .await?;
        Ok(())
    }
}
