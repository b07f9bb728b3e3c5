use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::credential::{Purpose, ResetTokenRecord};
use crate::store::CredentialStore;

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    sub: String,
    purpose: Purpose,
    jti: String,
    iat: usize,
    exp: usize,
}

/// Outcome of a successful token validation. The token is NOT marked used
/// here; that happens together with the password change it authorizes.
#[derive(Debug)]
pub struct ValidatedToken {
    pub subject: String,
    pub purpose: Purpose,
    pub token_id: String,
}

/// Issues and validates the signed, single-use reset tokens used by the
/// email track and the post-OTP verification receipts. One configured
/// signing secret; tampering is detectable without touching the store.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn CredentialStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(store: Arc<dyn CredentialStore>, secret: &str) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub async fn issue(&self, subject: &str, purpose: Purpose, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let jti = Uuid::new_v4().to_string();
        let claims = ResetClaims {
            sub: subject.to_string(),
            purpose,
            jti: jti.clone(),
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::service(format!("token encoding failed: {}", e)))?;

        self.store
            .put_token(ResetTokenRecord::new(&jti, subject, purpose, ttl))
            .await?;

        Ok(token)
    }

    /// Signature and expiry are checked statelessly first, so forged or
    /// stale tokens are rejected without a store round trip. Only then is
    /// the store consulted for single-use state.
    pub async fn validate(&self, token: &str) -> Result<ValidatedToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data =
            decode::<ResetClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::Expired,
                    _ => AppError::InvalidToken,
                }
            })?;
        let claims = data.claims;

        let record = self
            .store
            .get_token(&claims.jti)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if record.used_at.is_some() {
            return Err(AppError::AlreadyUsed);
        }
        if record.is_expired() {
            return Err(AppError::Expired);
        }

        Ok(ValidatedToken {
            subject: claims.sub,
            purpose: claims.purpose,
            token_id: claims.jti,
        })
    }

    pub async fn mark_used(&self, token_id: &str) -> Result<()> {
        self.store
            .mark_token_used(token_id)
            .await
            .map_err(|e| match e {
                AppError::StaleCredential => AppError::AlreadyUsed,
                other => other,
            })
    }
}
