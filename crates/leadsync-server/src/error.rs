//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use leadsync_common::SyncError;
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Sync(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            AppError::Sync(SyncError::Validation(_)) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            },
            AppError::Sync(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            AppError::Sync(SyncError::Validation(message)) => message,
            AppError::Sync(ref e) if status == StatusCode::BAD_GATEWAY => {
                tracing::warn!(error = %e, "Upstream API failure");
                e.to_string()
            },
            AppError::Sync(SyncError::Config(ref message)) => {
                tracing::error!("Configuration error: {}", message);
                "Server configuration error".to_string()
            },
            AppError::Sync(ref e) => {
                tracing::error!(error = %e, "Sync failed");
                e.to_string()
            },
            AppError::BadRequest(message) => message,
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_errors_map_to_bad_gateway() {
        let err = AppError::from(SyncError::fetch_failure("Amplemarket lead lists", 401, "nope"));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let err = AppError::from(SyncError::network("timed out"));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_missing_tokens_map_to_bad_request() {
        let err = AppError::from(SyncError::validation("Missing required tokens"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_errors_are_internal() {
        let err = AppError::from(SyncError::store("disk full"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
