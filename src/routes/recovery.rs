use axum::{routing::post, Router};

use crate::{handlers::recovery, state::AppState};

pub fn recovery_routes() -> Router<AppState> {
    Router::new()
        // Request a reset code (sms) or reset link (email)
        .route("/auth/forgot-password", post(recovery::forgot_password))
        // Verify the code and obtain a receipt
        .route("/auth/verify-otp", post(recovery::verify_otp))
        // Finish the reset with a receipt or an email token
        .route("/auth/reset-password", post(recovery::reset_password))
}
