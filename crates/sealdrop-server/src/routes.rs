//! HTTP route definitions

use crate::state::AppState;
use crate::{handlers, middleware};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Register, login, key lookup by name, and the health probe live
    // outside the session wall
    let public = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/auth/public-key/{researcher_id}",
            get(handlers::auth::lookup_public_key),
        );

    let authed = Router::new()
        // Identity & key registry
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/session", get(handlers::auth::session))
        .route("/api/auth/public-key", put(handlers::auth::set_public_key))
        .route("/api/auth/search", get(handlers::auth::search))
        // Blob store
        .route("/api/files/upload", post(handlers::files::upload))
        .route("/api/files/download/{file_id}", get(handlers::files::download))
        .route("/api/files", get(handlers::files::list_my_files))
        .route("/api/files/{file_id}", get(handlers::files::file_metadata))
        .route("/api/files/{file_id}", delete(handlers::files::delete_file))
        // Direct shares
        .route("/api/shares", post(handlers::shares::create_share))
        .route("/api/shares/code/{code}", get(handlers::shares::fetch_by_code))
        .route("/api/shares/outgoing", get(handlers::shares::list_outgoing))
        .route("/api/shares/incoming", get(handlers::shares::list_incoming))
        .route("/api/shares/{share_id}", delete(handlers::shares::revoke_share))
        // Groups
        .route("/api/groups", post(handlers::groups::create_group))
        .route("/api/groups", get(handlers::groups::list_groups))
        .route("/api/groups/shares", get(handlers::groups::list_group_shares))
        .route("/api/groups/{group_id}", get(handlers::groups::group_detail))
        .route("/api/groups/{group_id}", delete(handlers::groups::delete_group))
        .route("/api/groups/{group_id}/members", post(handlers::groups::add_member))
        .route(
            "/api/groups/{group_id}/members/{identity_id}",
            delete(handlers::groups::remove_member),
        )
        .route(
            "/api/groups/{group_id}/public-keys",
            get(handlers::groups::member_public_keys),
        )
        .route(
            "/api/groups/{group_id}/shares",
            post(handlers::groups::create_group_share),
        )
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::session_middleware,
        ));

    public
        .merge(authed)
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .with_state(state)
}
