// LogDepot - server/routes/upload.rs
//
// POST /upload: multipart form with a single `file` part. Public, like the
// rest of the ingestion surface; only reads require a token.

use crate::app::ingest::ingest;
use crate::server::error::{ApiError, INVALID_FILE};
use crate::server::state::ApiState;
use crate::util::constants;
use crate::util::error::IngestError;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        tracing::debug!(error = %err, "Malformed multipart body");
        ApiError::Validation(INVALID_FILE.to_string())
    }
}

pub async fn upload(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Upload is not a multipart form");
        ApiError::Validation(INVALID_FILE.to_string())
    })?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(constants::UPLOAD_FIELD_NAME) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload.ok_or(IngestError::MissingFile)?;
    if filename.is_empty() {
        return Err(IngestError::EmptyFilename.into());
    }

    let ctx = Arc::clone(&state.ctx);
    let report = tokio::task::spawn_blocking(move || ingest(&ctx, &filename, &bytes)).await??;

    Ok(Json(json!({ "message": report.message() })))
}
