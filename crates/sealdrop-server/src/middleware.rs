//! Session authentication and request logging middleware

use crate::auth::extract_bearer_token;
use crate::state::{AppState, AuthIdentity, CachedSession};
use crate::ApiError;
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use chrono::Utc;
use std::sync::Arc;

/// Resolve the bearer token to an identity and stash it in request
/// extensions. Checks the in-process cache first, falling back to the
/// sessions table; expired entries are evicted on sight.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?
        .to_string();

    if let Some(cached) = state.sessions.get(&token).map(|e| e.value().clone()) {
        if cached.expires_at > Utc::now() {
            request.extensions_mut().insert(AuthIdentity {
                id: cached.identity_id,
                researcher_id: cached.researcher_id,
                token,
            });
            return Ok(next.run(request).await);
        }
        state.evict_session(&token);
    }

    let (identity, expires_at) = state
        .db
        .identity_for_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid or expired session"))?;

    state.sessions.insert(
        token.clone(),
        CachedSession {
            identity_id: identity.id,
            researcher_id: identity.researcher_id.clone(),
            expires_at,
        },
    );

    request.extensions_mut().insert(AuthIdentity {
        id: identity.id,
        researcher_id: identity.researcher_id,
        token,
    });

    Ok(next.run(request).await)
}

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "request completed"
    );

    response
}
