use std::sync::Arc;

use chrono::Duration;
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::config::RecoveryPolicy;
use crate::errors::{AppError, Result};
use crate::models::credential::{OtpRecord, Purpose};
use crate::store::CredentialStore;

/// Issues and verifies one-time passcodes against the credential store.
#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn CredentialStore>,
    policy: RecoveryPolicy,
}

impl OtpService {
    pub fn new(store: Arc<dyn CredentialStore>, policy: RecoveryPolicy) -> Self {
        Self { store, policy }
    }

    /// Uniform random numeric code, leading zeros preserved.
    fn generate_code(length: usize) -> String {
        let mut rng = rand::thread_rng();
        let max = 10u64.pow(length as u32);
        format!("{:0width$}", rng.gen_range(0..max), width = length)
    }

    /// Generate and persist a fresh code for the key, superseding any
    /// outstanding one. The returned code goes to the notification
    /// channel and nowhere else.
    pub async fn issue(&self, subject: &str, purpose: Purpose) -> Result<String> {
        let code = Self::generate_code(self.policy.code_length);
        let record = OtpRecord::new(
            subject,
            &code,
            purpose,
            Duration::minutes(self.policy.otp_ttl_minutes),
            self.policy.max_attempts,
        );
        self.store.put(record).await?;
        Ok(code)
    }

    pub async fn verify(&self, subject: &str, purpose: Purpose, candidate: &str) -> Result<()> {
        let record = self
            .store
            .get_active(subject, purpose)
            .await?
            .ok_or(AppError::NoActiveCode)?;

        if record.is_expired() {
            return Err(AppError::Expired);
        }

        // The attempt is spent before the comparison and persists whatever
        // the outcome, so concurrent calls each burn a real attempt and an
        // exhausted counter fails even a correct candidate.
        let attempts = self
            .store
            .increment_attempts(subject, purpose)
            .await
            .map_err(|e| match e {
                AppError::StaleCredential => AppError::AttemptsExhausted,
                other => other,
            })?;

        if attempts > record.max_attempts {
            return Err(AppError::AttemptsExhausted);
        }

        let matches: bool = record
            .code
            .as_bytes()
            .ct_eq(candidate.as_bytes())
            .into();
        if !matches {
            return Err(AppError::Mismatch);
        }

        self.store
            .mark_consumed(subject, purpose)
            .await
            .map_err(|e| match e {
                // Another verification consumed the record between our
                // compare and this write; for this caller there is no
                // active code any more.
                AppError::StaleCredential => AppError::NoActiveCode,
                other => other,
            })?;

        Ok(())
    }
}
