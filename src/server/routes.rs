// src/server/routes.rs
//! Axum router configuration for the Parcel server

use crate::server::auth::require_token;
use crate::server::error::{ApiError, Problem};
use crate::server::handlers::{meta, packages, tokens};
use crate::server::SharedState;
use axum::{
    Router,
    http::Uri,
    middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

/// Create the main application router
///
/// The token gate wraps every route and the fallback, so unknown paths
/// answer 401 rather than 404 to unauthenticated callers once tokens exist.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/hello", get(meta::hello))
        .route("/api/v1/version", get(meta::version))
        .route("/api/v1/stats", get(meta::stats))
        // Packages
        .route(
            "/api/v1/packages",
            get(packages::list_packages).post(packages::create_package),
        )
        .route("/api/v1/package/:id", get(packages::get_package))
        .route(
            "/api/v1/package/:id/download",
            post(packages::download_package),
        )
        .route(
            "/api/v1/package/:id/activate",
            post(packages::activate_package),
        )
        // Tokens
        .route(
            "/api/v1/tokens",
            get(tokens::list_tokens).post(tokens::issue_token),
        )
        .route("/api/v1/tokens/all", delete(tokens::revoke_other_tokens))
        .route("/api/v1/token/:id", delete(tokens::revoke_token))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    Problem::not_found(&format!("route {}", uri.path())).into()
}
