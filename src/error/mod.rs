//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::hgsmart::ApiError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Vendor authentication failed: {0}")]
    VendorAuth(String),

    #[error("Vendor unreachable: {0}")]
    VendorUnavailable(String),

    #[error("Vendor error: {0}")]
    VendorError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(msg) => AppError::VendorAuth(msg),
            ApiError::Transport(e) => AppError::VendorUnavailable(e.to_string()),
            ApiError::Application { code, msg } => {
                AppError::VendorError(format!("code {}: {}", code, msg))
            }
            ApiError::NotFound(what) => AppError::NotFound(what),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::VendorAuth(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Vendor authentication failed: {}", msg),
            ),
            AppError::VendorUnavailable(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Vendor unreachable: {}", msg),
            ),
            AppError::VendorError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
