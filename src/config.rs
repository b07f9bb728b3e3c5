// config.rs
use std::env;

use crate::errors::{AppError, Result};

/// Which credential store backs the recovery flow. The in-memory backend
/// exists for local development and tests; production runs on Mongo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub provider: String,
    pub api_key: String,
    pub username: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from: String,
    pub reset_link_base: String,
}

/// Policy knobs for the recovery flow. Defaults match the product policy:
/// 6-digit codes valid 10 minutes with 3 attempts, reset links valid 1 hour.
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    pub code_length: usize,
    pub otp_ttl_minutes: i64,
    pub token_ttl_minutes: i64,
    pub receipt_ttl_minutes: i64,
    pub max_attempts: i32,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        RecoveryPolicy {
            code_length: 6,
            otp_ttl_minutes: 10,
            token_ttl_minutes: 60,
            receipt_ttl_minutes: 10,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_name: String,
    pub host: String,
    pub port: u16,
    pub reset_token_secret: String,
    pub store_backend: StoreBackend,
    pub sms: SmsConfig,
    pub email: EmailConfig,
    pub policy: RecoveryPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let store_backend = match env_or("STORE_BACKEND", "mongo").as_str() {
            "mongo" => StoreBackend::Mongo,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown STORE_BACKEND '{}', expected 'mongo' or 'memory'",
                    other
                )))
            }
        };

        let sms = SmsConfig {
            provider: env_or("SMS_PROVIDER", "console"),
            api_key: env_or("SMS_API_KEY", ""),
            username: env_or("SMS_USERNAME", "sandbox"),
            from: env_or("SMS_FROM", "PharmaCart"),
        };

        let email = EmailConfig {
            provider: env_or("EMAIL_PROVIDER", "console"),
            smtp_host: env_or("SMTP_HOST", ""),
            smtp_port: parse_env("SMTP_PORT", 587)?,
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            from: env_or("EMAIL_FROM", "PharmaCart <no-reply@pharmacart.app>"),
            reset_link_base: env_or("RESET_LINK_BASE", "https://app.pharmacart.app/reset-password"),
        };

        let policy = RecoveryPolicy {
            code_length: parse_env("OTP_CODE_LENGTH", 6)?,
            otp_ttl_minutes: parse_env("OTP_TTL_MINUTES", 10)?,
            token_ttl_minutes: parse_env("TOKEN_TTL_MINUTES", 60)?,
            receipt_ttl_minutes: parse_env("RECEIPT_TTL_MINUTES", 10)?,
            max_attempts: parse_env("OTP_MAX_ATTEMPTS", 3)?,
        };

        Ok(AppConfig {
            database_url: required("DATABASE_URL")?,
            database_name: env_or("DATABASE_NAME", "pharmacart"),
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", 3000)?,
            reset_token_secret: required("RESET_TOKEN_SECRET")?,
            store_backend,
            sms,
            email,
            policy,
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| AppError::configuration(format!("{} must be set", name)))
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::configuration(format!("{} must be a number", name))),
        Err(_) => Ok(default),
    }
}
