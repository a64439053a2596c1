// src/server/error.rs
//! Error responses (RFC 7807 problem details)

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Problem document returned for every failed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Error type URI
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable title
    pub title: String,
    /// HTTP status code
    pub status: u16,
    /// Detailed description
    pub detail: String,
}

impl Problem {
    pub fn new(error_type: &str, title: &str, status: u16, detail: &str) -> Self {
        Self {
            error_type: format!("urn:parcel:error:{}", error_type),
            title: title.to_string(),
            status,
            detail: detail.to_string(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("not_found", "Not Found", 404, &format!("{} not found", resource))
    }

    pub fn conflict(detail: &str) -> Self {
        Self::new("conflict", "Conflict", 409, detail)
    }

    pub fn precondition_failed(detail: &str) -> Self {
        Self::new("precondition_failed", "Precondition Failed", 412, detail)
    }

    pub fn unauthorized(detail: &str) -> Self {
        Self::new("unauthorized", "Unauthorized", 401, detail)
    }

    pub fn internal(detail: &str) -> Self {
        Self::new("internal", "Internal Error", 500, detail)
    }
}

/// Wrapper so handlers can return `Result<_, ApiError>`
#[derive(Debug)]
pub struct ApiError(pub Problem);

impl From<Problem> for ApiError {
    fn from(problem: Problem) -> Self {
        ApiError(problem)
    }
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        use crate::Error;

        let problem = match &err {
            Error::NotFound(what) => Problem::not_found(what),
            Error::Conflict(detail) => Problem::conflict(detail),
            Error::Precondition(detail) => Problem::precondition_failed(detail),
            Error::Unauthorized(detail) => Problem::unauthorized(detail),
            _ => {
                tracing::error!("Request failed: {}", err);
                Problem::internal(&err.to_string())
            }
        };
        ApiError(problem)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            [("content-type", "application/problem+json")],
            Json(&self.0),
        )
            .into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
