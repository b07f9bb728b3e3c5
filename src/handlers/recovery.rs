use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::services::recovery_service::RecoveryMethod;
use crate::state::AppState;

// Request DTOs
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 3, message = "Identifier must be at least 3 characters"))]
    pub identifier: String,
    pub method: RecoveryMethod,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 6, max = 6, message = "Code must be 6 digits"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset credential is required"))]
    pub credential: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

// Response DTOs
#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    pub data: ReceiptData,
}

#[derive(Debug, Serialize)]
pub struct ReceiptData {
    pub receipt: String,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub success: bool,
    pub message: String,
}

// 1. Forgot password: start a recovery attempt. The reply is the same
// whether or not the identifier matches an account.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>> {
    req.validate()
        .map_err(|e| AppError::invalid_data(e.to_string()))?;

    state
        .recovery
        .request_reset(&req.identifier, req.method)
        .await?;

    Ok(Json(ForgotPasswordResponse {
        success: true,
        message: "If an account matches, a reset code or link has been sent.".to_string(),
    }))
}

// 2. Verify OTP (SMS track): a correct code yields the receipt required
// by the reset endpoint.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>> {
    req.validate()
        .map_err(|e| AppError::invalid_data(e.to_string()))?;

    let receipt = state.recovery.verify_code(&req.phone, &req.code).await?;

    Ok(Json(VerifyOtpResponse {
        success: true,
        message: "Code verified".to_string(),
        data: ReceiptData { receipt },
    }))
}

// 3. Reset password: terminal step for both tracks.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>> {
    req.validate()
        .map_err(|e| AppError::invalid_data(e.to_string()))?;

    state
        .recovery
        .finalize_reset(&req.credential, &req.new_password)
        .await?;

    Ok(Json(ResetPasswordResponse {
        success: true,
        message: "Password reset successful".to_string(),
    }))
}
