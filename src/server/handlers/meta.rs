// src/server/handlers/meta.rs
//! Greeting, version and stats endpoints

use crate::lifecycle::DownloadStats;
use crate::server::SharedState;
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// GET /hello
pub async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello World!" }))
}

/// GET /api/v1/version
pub async fn version() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

/// GET /api/v1/stats
pub async fn stats(State(state): State<SharedState>) -> Json<DownloadStats> {
    Json(state.engine.stats())
}
