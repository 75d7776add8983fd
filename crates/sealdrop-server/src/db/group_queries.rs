//! Group, membership, and group-share queries

use crate::db::Database;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A membership joined with the member's registry entry
#[derive(Debug, Clone, FromRow)]
pub struct GroupMemberRow {
    pub group_id: i64,
    pub identity_id: i64,
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub researcher_id: String,
    pub has_public_key: bool,
}

/// A member together with their registered public key
#[derive(Debug, Clone, FromRow)]
pub struct MemberKeyRow {
    pub identity_id: i64,
    pub researcher_id: String,
    pub kyber_public_key: Vec<u8>,
}

/// A group share joined with file and group metadata, carrying one member's
/// wrapped payload
#[derive(Debug, Clone, FromRow)]
pub struct GroupShareDetailRow {
    pub id: i64,
    pub file_id: i64,
    pub group_id: i64,
    pub group_name: String,
    pub shared_by_name: String,
    pub created_at: DateTime<Utc>,
    pub file_name: String,
    pub content_type: String,
    pub original_size: i64,
    pub encrypted_size: i64,
    pub sha256_hash: String,
    pub iv: String,
    pub payload: Vec<u8>,
}

const MEMBER_SELECT: &str = r#"
    SELECT gm.group_id, gm.identity_id, gm.role, gm.joined_at,
           i.researcher_id,
           i.kyber_public_key IS NOT NULL AS has_public_key
    FROM group_members gm
    JOIN identities i ON i.id = gm.identity_id
"#;

const GROUP_SHARE_DETAIL_SELECT: &str = r#"
    SELECT gs.id, gs.file_id, gs.group_id, g.name AS group_name,
           sb.researcher_id AS shared_by_name, gs.created_at,
           f.file_name, f.content_type, f.original_size, f.encrypted_size,
           f.sha256_hash, f.iv,
           gsk.payload
    FROM group_shares gs
    JOIN groups g ON g.id = gs.group_id
    JOIN files f ON f.id = gs.file_id
    JOIN identities sb ON sb.id = gs.shared_by
    JOIN group_share_keys gsk ON gsk.group_share_id = gs.id
"#;

impl Database {
    /// Create a group and enroll the creator with the owner role, atomically
    pub async fn create_group(
        &self,
        name: &str,
        description: &str,
        owner_id: i64,
    ) -> Result<GroupRow, sqlx::Error> {
        let mut tx = self.begin().await?;

        let group = sqlx::query_as::<_, GroupRow>(
            r#"
            INSERT INTO groups (name, description, owner_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO group_members (group_id, identity_id, role, joined_at) VALUES (?1, ?2, 'owner', ?3)",
        )
        .bind(group.id)
        .bind(owner_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(group)
    }

    pub async fn group_by_id(&self, id: i64) -> Result<Option<GroupRow>, sqlx::Error> {
        sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE id = ?1")
            .bind(id)
            .fetch_optional(&**self)
            .await
    }

    /// Groups the identity belongs to, with their role in each
    pub async fn groups_for_identity(
        &self,
        identity_id: i64,
    ) -> Result<Vec<(GroupRow, String)>, sqlx::Error> {
        #[derive(FromRow)]
        struct Hit {
            #[sqlx(flatten)]
            group: GroupRow,
            role: String,
        }

        let rows = sqlx::query_as::<_, Hit>(
            r#"
            SELECT g.*, gm.role
            FROM groups g
            JOIN group_members gm ON gm.group_id = g.id
            WHERE gm.identity_id = ?1
            ORDER BY g.created_at DESC
            "#,
        )
        .bind(identity_id)
        .fetch_all(&**self)
        .await?;

        Ok(rows.into_iter().map(|h| (h.group, h.role)).collect())
    }

    pub async fn group_membership(
        &self,
        group_id: i64,
        identity_id: i64,
    ) -> Result<Option<GroupMemberRow>, sqlx::Error> {
        let sql = format!("{MEMBER_SELECT} WHERE gm.group_id = ?1 AND gm.identity_id = ?2");
        sqlx::query_as::<_, GroupMemberRow>(&sql)
            .bind(group_id)
            .bind(identity_id)
            .fetch_optional(&**self)
            .await
    }

    pub async fn group_members(&self, group_id: i64) -> Result<Vec<GroupMemberRow>, sqlx::Error> {
        let sql = format!("{MEMBER_SELECT} WHERE gm.group_id = ?1 ORDER BY gm.joined_at");
        sqlx::query_as::<_, GroupMemberRow>(&sql)
            .bind(group_id)
            .fetch_all(&**self)
            .await
    }

    /// Enroll a member; UNIQUE violation means they already belong
    pub async fn add_group_member(
        &self,
        group_id: i64,
        identity_id: i64,
        role: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO group_members (group_id, identity_id, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(group_id)
        .bind(identity_id)
        .bind(role)
        .bind(Utc::now())
        .execute(&**self)
        .await?;
        Ok(())
    }

    /// Remove a membership; future group reads by that identity stop here,
    /// payloads they already fetched are beyond reach
    pub async fn remove_group_member(
        &self,
        group_id: i64,
        identity_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = ?1 AND identity_id = ?2")
            .bind(group_id)
            .bind(identity_id)
            .execute(&**self)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Members of the group who have a registered public key
    pub async fn group_member_keys(&self, group_id: i64) -> Result<Vec<MemberKeyRow>, sqlx::Error> {
        sqlx::query_as::<_, MemberKeyRow>(
            r#"
            SELECT gm.identity_id, i.researcher_id, i.kyber_public_key
            FROM group_members gm
            JOIN identities i ON i.id = gm.identity_id
            WHERE gm.group_id = ?1 AND i.kyber_public_key IS NOT NULL
            ORDER BY gm.joined_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&**self)
        .await
    }

    /// Record a group fan-out: the share row and every per-member payload
    /// commit together or not at all. Re-sharing the same file to the same
    /// group replaces the previous payload set.
    pub async fn upsert_group_share(
        &self,
        file_id: i64,
        group_id: i64,
        shared_by: i64,
        payloads: &[(i64, Vec<u8>)],
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM group_shares WHERE file_id = ?1 AND group_id = ?2")
            .bind(file_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        let share_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO group_shares (file_id, group_id, shared_by, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(file_id)
        .bind(group_id)
        .bind(shared_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for (member_id, payload) in payloads {
            sqlx::query(
                "INSERT INTO group_share_keys (group_share_id, member_id, payload) VALUES (?1, ?2, ?3)",
            )
            .bind(share_id)
            .bind(member_id)
            .bind(payload)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(share_id)
    }

    /// Group shares visible to the identity: one row per share where they
    /// are a current member and hold a payload entry
    pub async fn group_shares_for_identity(
        &self,
        identity_id: i64,
    ) -> Result<Vec<GroupShareDetailRow>, sqlx::Error> {
        let sql = format!(
            r#"{GROUP_SHARE_DETAIL_SELECT}
            JOIN group_members gm ON gm.group_id = gs.group_id AND gm.identity_id = ?1
            WHERE gsk.member_id = ?1
            ORDER BY gs.created_at DESC"#
        );
        sqlx::query_as::<_, GroupShareDetailRow>(&sql)
            .bind(identity_id)
            .fetch_all(&**self)
            .await
    }

    /// Group shares within one group, carrying the caller's payload
    pub async fn group_shares_in_group(
        &self,
        group_id: i64,
        identity_id: i64,
    ) -> Result<Vec<GroupShareDetailRow>, sqlx::Error> {
        let sql = format!(
            r#"{GROUP_SHARE_DETAIL_SELECT}
            WHERE gs.group_id = ?1 AND gsk.member_id = ?2
            ORDER BY gs.created_at DESC"#
        );
        sqlx::query_as::<_, GroupShareDetailRow>(&sql)
            .bind(group_id)
            .bind(identity_id)
            .fetch_all(&**self)
            .await
    }

    /// Delete a group; memberships, group shares, and fan-out keys cascade
    pub async fn delete_group(&self, group_id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM groups WHERE id = ?1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }
}
