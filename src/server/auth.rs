// src/server/auth.rs
//! Token gate applied to the whole router

use crate::auth::{Access, parse_authorization, redact};
use crate::Error;
use crate::server::SharedState;
use crate::server::error::ApiError;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

/// Paths reachable without a token
pub const PUBLIC_PATHS: &[&str] = &["/hello", "/api/v1/version"];

/// Token value the caller authenticated with; `None` in bootstrap mode
#[derive(Debug, Clone, Default)]
pub struct PresentedToken(pub Option<String>);

/// Reject requests whose `Authorization: Token <value>` is missing or unknown
///
/// While no token exists every request passes.
pub async fn require_token(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization)
        .map(str::to_string);

    let authenticated = match state.tokens.authenticate(presented.as_deref()).await? {
        Access::Open => None,
        Access::Token(value) => Some(value),
        Access::Denied => {
            let shown = presented.as_deref().map(redact);
            warn!(
                path = %request.uri().path(),
                token = shown.as_deref().unwrap_or("none"),
                "Rejected request"
            );
            return Err(Error::Unauthorized("missing or invalid token".to_string()).into());
        }
    };

    request.extensions_mut().insert(PresentedToken(authenticated));
    Ok(next.run(request).await)
}
