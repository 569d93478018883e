// LogDepot - server/routes/auth.rs
//
// POST /register and POST /login.

use crate::server::error::ApiError;
use crate::server::state::ApiState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

fn credentials(payload: Result<Json<Credentials>, JsonRejection>) -> Result<Credentials, ApiError> {
    payload.map(|Json(c)| c).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Malformed credentials body");
        ApiError::Validation("Username and password are required".to_string())
    })
}

pub async fn register(
    State(state): State<ApiState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Credentials { username, password } = credentials(payload)?;

    // Argon2 hashing and the credential store write both block.
    let ctx = Arc::clone(&state.ctx);
    tokio::task::spawn_blocking(move || ctx.users.register(&username, &password)).await??;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully!" })),
    ))
}

pub async fn login(
    State(state): State<ApiState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Credentials { username, password } = credentials(payload)?;

    let ctx = Arc::clone(&state.ctx);
    let token = tokio::task::spawn_blocking(move || {
        ctx.users.authenticate(&username, &password)?;
        ctx.gate.issue(&username)
    })
    .await??;

    Ok((StatusCode::OK, Json(json!({ "access_token": token }))))
}
