// LogDepot - server/routes/health.rs

use crate::server::state::ApiState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// GET /health: liveness plus the number of registered files.
pub async fn health(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "files": state.ctx.registry.len(),
    }))
}
