// LogDepot - server/routes/logs.rs

use crate::app::auth::Identity;
use crate::core::filter::{LogQuery, LogQueryParams};
use crate::core::model::LogRecord;
use crate::server::error::ApiError;
use crate::server::state::ApiState;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use std::sync::Arc;

/// GET /logs: time window, keyword and source-file filters over every
/// registered plain-text file.
pub async fn search_logs(
    State(state): State<ApiState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<Vec<LogRecord>>, ApiError> {
    // Parameter errors abort before any file is opened.
    let query = LogQuery::from_params(&params)?;

    let ctx = Arc::clone(&state.ctx);
    let records =
        tokio::task::spawn_blocking(move || ctx.query_engine().run(&query).records()).await?;

    tracing::debug!(
        username = %identity.username,
        matched = records.len(),
        "Logs searched"
    );
    Ok(Json(records))
}
