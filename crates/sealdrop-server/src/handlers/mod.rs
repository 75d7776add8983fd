//! HTTP request handlers

pub mod auth;
pub mod files;
pub mod groups;
pub mod shares;

use axum::Json;
use serde_json::{json, Value};

/// Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "sealdrop" }))
}
