// LogDepot - server/mod.rs
//
// HTTP surface (axum). Thin: handlers translate requests into app-layer
// calls and app-layer errors into `ApiError` responses. Blocking work
// (file I/O, parsing, extraction, snapshot writes) runs on the blocking pool.
// Dependencies: app, core, util.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use crate::app::context::AppContext;
use crate::util::error::LogDepotError;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use routes::{auth, files, health, logs, upload};
use state::ApiState;
use std::net::SocketAddr;
use std::sync::Arc;

/// Build the full router over `ctx`.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let state = ApiState::new(ctx);
    let max_upload = state.ctx.config.max_upload_bytes;

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(max_upload)),
        );

    let protected = Router::new()
        .route("/files", get(files::list_files))
        .route("/logs", get(logs::search_logs))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_identity,
        ));

    public.merge(protected).with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(ctx: Arc<AppContext>, addr: SocketAddr) -> Result<(), LogDepotError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| LogDepotError::Io {
            path: addr.to_string().into(),
            operation: "bind",
            source,
        })?;

    tracing::info!(%addr, "LogDepot listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| LogDepotError::Io {
            path: addr.to_string().into(),
            operation: "serve",
            source,
        })?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C; shutting down");
        return;
    }
    tracing::info!("Shutdown requested");
}
