// LogDepot - server/error.rs
//
// Mapping from domain errors to HTTP responses. Every error body has the
// shape `{"error": "<message>"}`. Internal failures are logged in full and
// reported to the client with a fixed message.

use crate::util::error::{AuthError, IngestError, QueryError, RegistryError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Message returned for every rejected upload.
pub const INVALID_FILE: &str = "Invalid file";

const INTERNAL: &str = "Internal server error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 400: the request itself is wrong.
    Validation(String),
    /// 401: missing, invalid or expired identity, or bad credentials.
    Unauthorized(String),
    /// 413: request body over the configured limit.
    PayloadTooLarge(String),
    /// 500: already logged; the message is not shown to the client.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log `err` and produce a sanitised 500.
    pub fn internal(err: &dyn std::error::Error) -> Self {
        tracing::error!(error = %err, "Request failed");
        Self::Internal(err.to_string())
    }

    /// The message the client sees.
    fn public_message(&self) -> &str {
        match self {
            Self::Validation(m) | Self::Unauthorized(m) | Self::PayloadTooLarge(m) => m,
            Self::Internal(_) => INTERNAL,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.public_message(), self.status())
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.public_message(),
        });
        (self.status(), body).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        if err.is_validation() {
            Self::Validation(INVALID_FILE.to_string())
        } else {
            Self::internal(&err)
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidFilter { .. } => Self::Validation(err.to_string()),
            RegistryError::Persist(_) => Self::internal(&err),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidDate { .. } => Self::Validation(err.to_string()),
            QueryError::Filter(inner) => inner.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken
            | AuthError::InvalidToken { .. }
            | AuthError::TokenExpired
            | AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::UsernameTaken { .. } | AuthError::InvalidInput { .. } => {
                Self::Validation(err.to_string())
            }
            AuthError::Signing { .. }
            | AuthError::WeakSecret { .. }
            | AuthError::PasswordHash { .. }
            | AuthError::Persist(_) => Self::internal(&err),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(&err)
    }
}
