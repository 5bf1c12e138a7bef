//! API error handling

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::platform::PlatformError;
use crate::storage::StoreError;

/// Every way a request can fail. Only validation messages reach the client;
/// the rest are logged and answered with an opaque body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    /// Malformed request body with a status other than 400, such as an
    /// upload over the body limit.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// `<field> is missing`
    pub fn missing(field: &str) -> Self {
        ApiError::Validation(format!("{} is missing", field))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Platform(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Attach the route and identifying parameter to the server log before
    /// the error leaves the handler.
    pub fn logged(self, route: &str, subject: &str) -> Self {
        if !self.status_code().is_client_error() {
            error!("{} [{}] failed: {}", route, subject, self);
        }
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Validation(message) | ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Platform(_) => "platform request failed".to_string(),
            ApiError::Store(_) | ApiError::Io(_) => "internal server error".to_string(),
        };
        (self.status_code(), Json(ErrorResponse { message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        match err.status() {
            StatusCode::BAD_REQUEST => Self::bad_request(err.body_text()),
            status => ApiError::Rejected {
                status,
                message: err.body_text(),
            },
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::missing("name").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(StoreError::WriteError("disk full".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(PlatformError::Auth("bad secret".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_rejected_keeps_status_and_message() {
        let err = ApiError::Rejected {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "length limit exceeded" }));
    }

    #[tokio::test]
    async fn test_internal_details_stay_private() {
        let response =
            ApiError::from(StoreError::WriteError("/var/lib/secret".into())).into_response();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "internal server error" }));
    }
}
