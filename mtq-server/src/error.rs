//! API error type
//!
//! Every error carries the code of the action that failed. The code selects
//! the user-facing text returned alongside the technical message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::api::error_text::error_text;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid or malformed request (400)
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },

    /// Missing or wrong admin key (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Sentence set or sentence pair not found (404)
    #[error("{code}: {message}")]
    NotFound { code: &'static str, message: String },

    /// Store, rendering or bundling failure (500)
    #[error("{code}: {message}")]
    Internal { code: &'static str, message: String },
}

impl ApiError {
    /// Classify a core error under an action-specific code
    pub fn from_common(code: &'static str, err: mtq_common::Error) -> Self {
        use mtq_common::Error;

        match err {
            Error::Validation(message) | Error::Shape(message) => ApiError::BadRequest { code, message },
            Error::NotFound(message) => ApiError::NotFound { code, message },
            other => ApiError::Internal {
                code,
                message: other.to_string(),
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } | ApiError::NotFound { code, .. } | ApiError::Internal { code, .. } => code,
            ApiError::Unauthorized(_) => "unauthorized",
        }
    }
}

/// Attach an error code to a core result
pub trait WithErrorCode<T> {
    fn with_code(self, code: &'static str) -> ApiResult<T>;
}

impl<T> WithErrorCode<T> for mtq_common::Result<T> {
    fn with_code(self, code: &'static str) -> ApiResult<T> {
        self.map_err(|e| ApiError::from_common(code, e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            ApiError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message),
            ApiError::Internal { message, .. } => {
                error!("{}: {}", code, message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "text": error_text(code),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
