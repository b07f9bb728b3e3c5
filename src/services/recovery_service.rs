use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;

use crate::config::{AppConfig, RecoveryPolicy};
use crate::directory::UserDirectory;
use crate::errors::{AppError, Result};
use crate::models::credential::Purpose;
use crate::services::notify::{mask_phone, ChannelKind, Notification, Notifier};
use crate::services::otp_service::OtpService;
use crate::services::token_service::TokenService;
use crate::store::CredentialStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMethod {
    Sms,
    Email,
}

/// Drives a recovery attempt end to end: user lookup, credential issue,
/// dispatch, verification, and the final password change. Replies to
/// `request_reset` are deliberately identical for known and unknown
/// identifiers.
pub struct RecoveryService {
    directory: Arc<dyn UserDirectory>,
    otp: OtpService,
    tokens: TokenService,
    notifier: Notifier,
    policy: RecoveryPolicy,
    reset_link_base: String,
}

impl RecoveryService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn CredentialStore>,
        notifier: Notifier,
        config: &AppConfig,
    ) -> Self {
        Self {
            directory,
            otp: OtpService::new(store.clone(), config.policy.clone()),
            tokens: TokenService::new(store, &config.reset_token_secret),
            notifier,
            policy: config.policy.clone(),
            reset_link_base: config.email.reset_link_base.clone(),
        }
    }

    /// Start a recovery attempt. Succeeds without side effects for
    /// unknown identifiers, and still succeeds when delivery fails; both
    /// outcomes are logged, neither is surfaced.
    pub async fn request_reset(&self, identifier: &str, method: RecoveryMethod) -> Result<()> {
        match method {
            RecoveryMethod::Sms => self.request_sms_reset(identifier).await,
            RecoveryMethod::Email => self.request_email_reset(identifier).await,
        }
    }

    async fn request_sms_reset(&self, identifier: &str) -> Result<()> {
        let phone = normalize_phone(identifier)?;

        if self.directory.find_by_phone(&phone).await?.is_none() {
            tracing::info!(phone = %mask_phone(&phone), "reset requested for unknown phone");
            return Ok(());
        }

        let code = self.otp.issue(&phone, Purpose::PasswordReset).await?;
        let note = Notification {
            subject: "PharmaCart password reset".to_string(),
            body: format!(
                "PharmaCart password reset code is: {}. Valid for {} minutes.",
                code, self.policy.otp_ttl_minutes
            ),
        };

        if let Err(e) = self.notifier.send(ChannelKind::Sms, &phone, &note).await {
            tracing::error!(phone = %mask_phone(&phone), error = %e, "reset code delivery failed");
        }
        Ok(())
    }

    async fn request_email_reset(&self, identifier: &str) -> Result<()> {
        let Some(user) = self.directory.find_by_email(identifier).await? else {
            tracing::info!("reset requested for unknown email");
            return Ok(());
        };
        let user_id = user
            .id_hex()
            .ok_or_else(|| AppError::service("user record has no id"))?;

        let token = self
            .tokens
            .issue(
                &user_id,
                Purpose::EmailReset,
                Duration::minutes(self.policy.token_ttl_minutes),
            )
            .await?;
        let link = format!("{}?token={}", self.reset_link_base, token);

        let note = Notification {
            subject: "PharmaCart password reset".to_string(),
            body: format!(
                "We received a request to reset your PharmaCart password.\n\n\
                 Open this link to choose a new password:\n{}\n\n\
                 The link is valid for {} minutes. If you did not request \
                 this, you can ignore this email.",
                link, self.policy.token_ttl_minutes
            ),
        };

        if let Err(e) = self
            .notifier
            .send(ChannelKind::Email, &user.email, &note)
            .await
        {
            tracing::error!(error = %e, "reset link delivery failed");
        }
        Ok(())
    }

    /// SMS track only. A correct code consumes the OTP and yields a
    /// short-lived receipt; the receipt, not the code, authorizes the
    /// password change.
    pub async fn verify_code(&self, phone: &str, code: &str) -> Result<String> {
        let phone = normalize_phone(phone)?;
        self.otp
            .verify(&phone, Purpose::PasswordReset, code)
            .await?;

        let user = self
            .directory
            .find_by_phone(&phone)
            .await?
            .ok_or(AppError::NoActiveCode)?;
        let user_id = user
            .id_hex()
            .ok_or_else(|| AppError::service("user record has no id"))?;

        self.tokens
            .issue(
                &user_id,
                Purpose::ResetReceipt,
                Duration::minutes(self.policy.receipt_ttl_minutes),
            )
            .await
    }

    /// Terminal step for both tracks. The credential is an email reset
    /// token or a verification receipt; it burns only after the directory
    /// has accepted the new hash, so a failed update leaves it retryable.
    pub async fn finalize_reset(&self, credential: &str, new_password: &str) -> Result<()> {
        let validated = self.tokens.validate(credential).await?;
        match validated.purpose {
            Purpose::EmailReset | Purpose::ResetReceipt => {}
            Purpose::PasswordReset => return Err(AppError::InvalidToken),
        }

        let hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::service(format!("password hashing failed: {}", e)))?;

        self.directory
            .update_password_hash(&validated.subject, &hash)
            .await?;

        match self.tokens.mark_used(&validated.token_id).await {
            Ok(()) => Ok(()),
            Err(AppError::AlreadyUsed) => {
                // Lost a mark-used race after the hash was written; the
                // password change stands.
                tracing::warn!("reset credential already retired");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}

/// Light E.164 normalization: strip separators, require +<7..15 digits>.
fn normalize_phone(raw: &str) -> Result<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let valid = cleaned
        .strip_prefix('+')
        .map(|digits| {
            (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
        })
        .unwrap_or(false);

    if valid {
        Ok(cleaned)
    } else {
        Err(AppError::invalid_data(
            "Phone number must be in international format, e.g. +15551234567",
        ))
    }
}
