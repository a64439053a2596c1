// src/server/handlers/packages.rs
//! Package lifecycle endpoints

use crate::db::models::{Package, PackageStatus};
use crate::server::{ApiResult, SharedState};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

/// Body of POST /api/v1/packages
#[derive(Debug, Deserialize)]
pub struct CreatePackage {
    pub name: String,
    pub version: String,
}

/// Status-only response for download/activate
#[derive(Debug, Serialize)]
pub struct PackageStatusResponse {
    pub status: PackageStatus,
}

/// GET /api/v1/packages
pub async fn list_packages(State(state): State<SharedState>) -> ApiResult<Json<Vec<Package>>> {
    Ok(Json(state.engine.list().await?))
}

/// GET /api/v1/package/:id
pub async fn get_package(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Package>> {
    Ok(Json(state.engine.get(id).await?))
}

/// POST /api/v1/packages
///
/// Registers the package; 409 if the (name, version) pair already exists.
pub async fn create_package(
    State(state): State<SharedState>,
    Json(body): Json<CreatePackage>,
) -> ApiResult<Json<Package>> {
    let package = state.engine.register(body.name, body.version).await?;
    Ok(Json(package))
}

/// POST /api/v1/package/:id/download
///
/// Schedules a background download when the package is `created` and returns
/// its status without waiting.
pub async fn download_package(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PackageStatusResponse>> {
    let status = state.engine.request_download(id).await?;
    Ok(Json(PackageStatusResponse { status }))
}

/// POST /api/v1/package/:id/activate
///
/// 412 unless the package is exactly `downloaded`.
pub async fn activate_package(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PackageStatusResponse>> {
    let status = state.engine.activate(id).await?;
    Ok(Json(PackageStatusResponse { status }))
}
