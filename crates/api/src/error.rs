use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use provision_core::error::{CoreError, SchemaError, StoreError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce `{"error", "code"}` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `provision_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A schema that failed to build. Never expected once the server is up.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// No command with this name is registered.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::Validation(failure) => {
                    let status = failure
                        .status_hint
                        .and_then(|hint| StatusCode::from_u16(hint).ok())
                        .unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
                    let code = if status == StatusCode::NOT_FOUND {
                        "NOT_FOUND"
                    } else {
                        "VALIDATION_ERROR"
                    };
                    (status, code, failure.message.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Storage(err) => classify_store_error(err),
                CoreError::Internal(msg) => internal(msg),
            },

            AppError::Schema(err) => internal(&err.to_string()),

            AppError::UnknownCommand(name) => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_COMMAND",
                format!("no command named {name} is registered"),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Log the real cause and return a sanitized 500.
fn internal(msg: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a store error into an HTTP status, error code, and message.
///
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::UniqueViolation { constraint } if constraint.starts_with("uq_") => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Duplicate value violates unique constraint: {constraint}"),
        ),
        other => {
            tracing::error!(error = %other, "Store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
