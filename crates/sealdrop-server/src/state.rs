//! Application state

use crate::blobstore::BlobStore;
use crate::config::ServerConfig;
use crate::db::Database;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// The authenticated caller, resolved by the session middleware and
/// inserted into request extensions
#[derive(Clone, Debug)]
pub struct AuthIdentity {
    pub id: i64,
    pub researcher_id: String,
    /// The token the caller presented, kept for logout
    pub token: String,
}

/// Application state shared across handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Durable store for identities, sessions, files, and shares
    pub db: Database,
    /// On-disk ciphertext blobs
    pub blobs: BlobStore,
    /// Session cache fronting the sessions table; logout and expiry evict
    pub sessions: DashMap<String, CachedSession>,
}

/// A cache entry mirroring one row of the sessions table
#[derive(Clone, Debug)]
pub struct CachedSession {
    pub identity_id: i64,
    pub researcher_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AppState {
    /// Open the database and blob store described by the configuration
    pub async fn new(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        if let Some(parent) = config.database_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let db = Database::connect(&config.database_path).await?;
        let blobs = BlobStore::open(&config.blob_dir).await?;

        Ok(Arc::new(Self {
            config,
            db,
            blobs,
            sessions: DashMap::new(),
        }))
    }

    /// Drop a token from the cache (logout, expiry)
    pub fn evict_session(&self, token: &str) {
        self.sessions.remove(token);
    }
}
