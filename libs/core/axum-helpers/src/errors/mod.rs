pub mod handlers;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain_sessions::SessionError;
use serde::Serialize;
use thiserror::Error;

/// Standard error response structure.
///
/// # JSON Example
///
/// ```json
/// {
///   "error": {
///     "type": "unauthorized",
///     "message": "Unauthorized"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error identifier
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Human-readable message, safe to show clients
    pub message: String,
}

impl ErrorResponse {
    pub fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                kind,
                message: message.into(),
            },
        }
    }
}

/// Application error type that can be converted to HTTP responses.
///
/// Session failures arrive through `From<SessionError>`: every credential
/// problem becomes the same bare 401, and store outages become 503 so they
/// are not mistaken for a logged-out client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthorized => AppError::Unauthorized,
            SessionError::Store(e) => AppError::ServiceUnavailable(e.to_string()),
            SessionError::Token(e) => AppError::InternalServerError(e.to_string()),
            SessionError::Config(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("unauthorized", "Unauthorized"),
            ),
            AppError::JsonExtractorRejection(e) => {
                tracing::warn!("JSON extraction error: {:?}", e);
                (e.status(), ErrorResponse::new("bad_request", e.body_text()))
            }
            AppError::BadRequest(msg) => {
                tracing::info!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, ErrorResponse::new("bad_request", msg))
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("not_found", msg))
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal_error", "An internal server error occurred"),
                )
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new(
                        "service_unavailable",
                        "Service is temporarily unavailable",
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::ConfigError;
    use domain_sessions::{CodecError, StoreError};

    #[test]
    fn test_session_errors_map_to_status() {
        let cases = [
            (SessionError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                SessionError::Store(StoreError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SessionError::Token(CodecError::Encode("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SessionError::Config(ConfigError::Invalid("ttl".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ErrorResponse::new("unauthorized", "Unauthorized")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"error": {"type": "unauthorized", "message": "Unauthorized"}})
        );
    }
}
