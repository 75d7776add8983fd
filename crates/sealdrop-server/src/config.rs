//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sealdrop server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Directory holding ciphertext blobs
    pub blob_dir: PathBuf,
    /// Maximum request body size (bytes); bounds blob uploads
    pub max_body_size: usize,
    /// Session lifetime in seconds
    pub session_ttl_secs: i64,
    /// Minimum password length accepted at registration
    pub min_password_len: usize,
    /// Maximum results returned by identity prefix search
    pub search_limit: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7600,
            database_path: PathBuf::from("data/sealdrop.db"),
            blob_dir: PathBuf::from("storage"),
            // 100 MiB of plaintext plus sealing overhead and multipart framing
            max_body_size: 100 * 1024 * 1024 + 64 * 1024,
            session_ttl_secs: 24 * 60 * 60,
            min_password_len: 6,
            search_limit: 20,
        }
    }
}

impl ServerConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
