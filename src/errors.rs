// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Delivery outcomes from the notification channel. Providers report
/// declines and timeouts as values so the orchestrator can decide what
/// (if anything) to surface.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("provider declined: {0}")]
    ProviderDeclined(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("delivery timed out")]
    Timeout,

    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("No active code for this subject")]
    NoActiveCode,

    #[error("Credential expired")]
    Expired,

    #[error("Verification attempts exhausted")]
    AttemptsExhausted,

    #[error("Code mismatch")]
    Mismatch,

    #[error("Invalid reset token")]
    InvalidToken,

    #[error("Reset token already used")]
    AlreadyUsed,

    #[error("Credential is no longer active")]
    StaleCredential,

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Directory update failed: {0}")]
    DirectoryUpdate(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Verify-path failures collapse into one generic message so the
        // response does not reveal whether a code exists, is expired, or
        // has attempts remaining. Token failures collapse the same way.
        let (status, error_message) = match &self {
            AppError::MongoDB(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string()),
            AppError::NoActiveCode
            | AppError::Expired
            | AppError::AttemptsExhausted
            | AppError::Mismatch => (StatusCode::BAD_REQUEST, "Invalid or expired code".to_string()),
            AppError::InvalidToken
            | AppError::AlreadyUsed
            | AppError::StaleCredential => (StatusCode::BAD_REQUEST, "Invalid or expired reset credential".to_string()),
            AppError::Delivery(_) => (StatusCode::BAD_GATEWAY, "Delivery failed".to_string()),
            AppError::DirectoryUpdate(_) => (StatusCode::SERVICE_UNAVAILABLE, "Could not update password, please retry".to_string()),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "Validation failed".to_string()),
            AppError::ConfigurationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error".to_string()),
            AppError::ServiceError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Service error".to_string()),
        };

        let body = Json(json!({
            "error": &error_message,
            "message": &error_message,
            "success": false,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        AppError::ServiceError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
