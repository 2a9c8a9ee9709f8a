//! API error type and its JSON response shape.
//!
//! Every failure leaves the server as
//! `{"error": {"code": "...", "message": "..."}}` with a matching status.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mauri_common::MauriError;
use mauri_db::DbError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn forbidden() -> Self {
        ApiError::PermissionDenied("You do not have required permission".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PermissionDenied(_) => "FORBIDDEN",
            ApiError::Validation(_) => "BAD_REQUEST",
            ApiError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotConfigured => ApiError::Unavailable("Database not available".to_string()),
            DbError::Duplicate(what) => ApiError::Conflict(format!("{what} already exists")),
            DbError::Common(inner) => inner.into(),
            other => {
                tracing::error!(error = %other, "database failure");
                ApiError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<MauriError> for ApiError {
    fn from(err: MauriError) -> Self {
        match err {
            MauriError::Validation { .. } | MauriError::UnknownVariant { .. } => {
                ApiError::Validation(err.to_string())
            }
            other => {
                tracing::error!(error = %other, "internal failure");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<minijinja::Error> for ApiError {
    fn from(err: minijinja::Error) -> Self {
        tracing::error!(error = %err, "template render failed");
        ApiError::Internal("Template error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": { "code": self.code(), "message": self.to_string() }
        }));
        (self.status(), body).into_response()
    }
}
