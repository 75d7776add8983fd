//! SQLite persistence
//!
//! A thin newtype over `SqlitePool`; query methods live in per-domain
//! modules as `impl Database` blocks. The schema is applied at startup and
//! every multi-row mutation (group fan-out, cascade delete) runs inside a
//! transaction.

mod file_queries;
mod group_queries;
mod identity_queries;
mod share_queries;

pub use file_queries::FileRow;
pub use group_queries::{GroupMemberRow, GroupRow, GroupShareDetailRow, MemberKeyRow};
pub use identity_queries::IdentityRow;
pub use share_queries::{ShareDetailRow, ShareRow};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::ops::Deref;
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS identities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    researcher_id TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    kyber_public_key BLOB,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    identity_id INTEGER NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL REFERENCES identities(id),
    file_name TEXT NOT NULL,
    original_size INTEGER NOT NULL,
    encrypted_size INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    sha256_hash TEXT NOT NULL,
    iv TEXT NOT NULL,
    owner_kem_ct BLOB NOT NULL,
    storage_name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shares (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    sender_id INTEGER NOT NULL REFERENCES identities(id),
    recipient_id INTEGER NOT NULL REFERENCES identities(id),
    payload BLOB NOT NULL,
    share_code TEXT NOT NULL UNIQUE,
    permission TEXT NOT NULL,
    viewed INTEGER NOT NULL DEFAULT 0,
    revoked INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    owner_id INTEGER NOT NULL REFERENCES identities(id),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS group_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    identity_id INTEGER NOT NULL REFERENCES identities(id),
    role TEXT NOT NULL DEFAULT 'member',
    joined_at TEXT NOT NULL,
    UNIQUE (group_id, identity_id)
);

CREATE TABLE IF NOT EXISTS group_shares (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    shared_by INTEGER NOT NULL REFERENCES identities(id),
    created_at TEXT NOT NULL,
    UNIQUE (file_id, group_id)
);

CREATE TABLE IF NOT EXISTS group_share_keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_share_id INTEGER NOT NULL REFERENCES group_shares(id) ON DELETE CASCADE,
    member_id INTEGER NOT NULL REFERENCES identities(id),
    payload BLOB NOT NULL,
    UNIQUE (group_share_id, member_id)
);

CREATE INDEX IF NOT EXISTS idx_files_owner ON files(owner_id);
CREATE INDEX IF NOT EXISTS idx_shares_file ON shares(file_id);
CREATE INDEX IF NOT EXISTS idx_shares_recipient ON shares(recipient_id);
CREATE INDEX IF NOT EXISTS idx_sessions_identity ON sessions(identity_id);
CREATE INDEX IF NOT EXISTS idx_group_members_identity ON group_members(identity_id);
"#;

/// Handle to the SQLite pool
#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    /// Open (creating if missing) the database at `path` and apply the schema
    pub async fn connect(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.0
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// True when the error is a UNIQUE-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
