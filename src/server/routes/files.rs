// LogDepot - server/routes/files.rs

use crate::app::auth::Identity;
use crate::core::filter::FileFilter;
use crate::core::model::FileRecord;
use crate::server::error::ApiError;
use crate::server::state::ApiState;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct FilesParams {
    pub filename: Option<String>,
    pub file_type: Option<String>,
    pub date: Option<String>,
}

/// GET /files: registry lookup by name, type and ingestion date.
pub async fn list_files(
    State(state): State<ApiState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<FilesParams>,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    let filter = FileFilter::from_params(
        params.filename.as_deref(),
        params.file_type.as_deref(),
        params.date.as_deref(),
    )?;

    let ctx = Arc::clone(&state.ctx);
    let records = tokio::task::spawn_blocking(move || {
        ctx.registry
            .find(&filter)
            .iter()
            .map(|f| FileRecord::from(f.as_ref()))
            .collect::<Vec<_>>()
    })
    .await?;

    tracing::debug!(
        username = %identity.username,
        matched = records.len(),
        "Files listed"
    );
    Ok(Json(records))
}
