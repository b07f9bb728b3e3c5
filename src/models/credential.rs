use chrono::{Duration, Utc};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// What a credential authorizes. Stored with the record and embedded in
/// signed tokens; the two must agree at verification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    PasswordReset,
    EmailReset,
    ResetReceipt,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::PasswordReset => "password_reset",
            Purpose::EmailReset => "email_reset",
            Purpose::ResetReceipt => "reset_receipt",
        }
    }
}

/// One-time passcode record. At most one unconsumed, unsuperseded record
/// exists per (subject, purpose); issuing a new code supersedes the old one.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OtpRecord {
    pub subject: String,
    pub code: String,
    pub purpose: Purpose,
    pub issued_at: DateTime,
    pub expires_at: DateTime,
    pub attempts: i32,
    pub max_attempts: i32,
    pub consumed_at: Option<DateTime>,
    pub superseded: bool,
}

impl OtpRecord {
    pub fn new(
        subject: &str,
        code: &str,
        purpose: Purpose,
        ttl: Duration,
        max_attempts: i32,
    ) -> Self {
        let now = Utc::now();
        let expires_at = now + ttl;
        OtpRecord {
            subject: subject.to_string(),
            code: code.to_string(),
            purpose,
            issued_at: DateTime::from_millis(now.timestamp_millis()),
            expires_at: DateTime::from_millis(expires_at.timestamp_millis()),
            attempts: 0,
            max_attempts,
            consumed_at: None,
            superseded: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.timestamp_millis() <= Utc::now().timestamp_millis()
    }
}

/// Signed reset-token record, keyed by the token's `jti` claim so lookup
/// is a point read. Covers both the email reset link and the receipt
/// minted after a successful OTP verification.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResetTokenRecord {
    pub token_id: String,
    pub subject: String,
    pub purpose: Purpose,
    pub issued_at: DateTime,
    pub expires_at: DateTime,
    pub used_at: Option<DateTime>,
}

impl ResetTokenRecord {
    pub fn new(token_id: &str, subject: &str, purpose: Purpose, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at = now + ttl;
        ResetTokenRecord {
            token_id: token_id.to_string(),
            subject: subject.to_string(),
            purpose,
            issued_at: DateTime::from_millis(now.timestamp_millis()),
            expires_at: DateTime::from_millis(expires_at.timestamp_millis()),
            used_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.timestamp_millis() <= Utc::now().timestamp_millis()
    }
}
