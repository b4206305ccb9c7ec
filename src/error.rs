use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Authorization state mismatch")]
    AuthStateMismatch,

    #[error("Code verifier not found")]
    MissingCodeVerifier,

    #[error("Token exchange failed: {status}")]
    TokenExchangeFailed { status: u16 },

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("No access token available")]
    NoTokenAvailable,

    #[error("API request failed: {status}")]
    RequestFailed { status: u16 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthorizationDenied(ref reason) => {
                tracing::warn!("Authorization denied by provider: {}", reason);
                (StatusCode::UNAUTHORIZED, "Authentication failed".to_string())
            }
            AppError::AuthStateMismatch | AppError::MissingCodeVerifier => {
                tracing::warn!("Rejected authorization callback: {}", self);
                (StatusCode::BAD_REQUEST, "Authentication failed".to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::TokenExchangeFailed { .. } | AppError::RefreshFailed(_) => {
                (StatusCode::BAD_GATEWAY, "Authentication failed".to_string())
            }
            AppError::Http(ref e) => {
                tracing::error!("HTTP error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "Upstream error".to_string())
            }
            AppError::RequestFailed { status } => {
                tracing::error!("Upstream API returned {}", status);
                (StatusCode::BAD_GATEWAY, "Upstream error".to_string())
            }
            AppError::NoTokenAvailable => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Storage(ref e) => {
                tracing::error!("Storage error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
