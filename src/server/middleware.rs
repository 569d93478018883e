// LogDepot - server/middleware.rs
//
// Bearer-token gate for the protected routes. A request without a valid
// token is answered with 401 before its handler runs; a valid one carries
// the caller's `Identity` as a request extension.

use crate::server::error::ApiError;
use crate::server::state::ApiState;
use crate::util::error::AuthError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

pub async fn require_identity(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or(AuthError::MissingToken)?
        .to_string();

    let identity = state.ctx.gate.authorize(&token).map_err(|e| {
        tracing::debug!(error = %e, path = %request.uri().path(), "Rejected token");
        e
    })?;

    tracing::trace!(username = %identity.username, "Request authorised");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
