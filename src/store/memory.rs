use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::DateTime;
use tokio::sync::Mutex;

use crate::errors::{AppError, Result};
use crate::models::credential::{OtpRecord, Purpose, ResetTokenRecord};
use crate::store::CredentialStore;

/// In-memory credential store for tests and local development
/// (`STORE_BACKEND=memory`). One mutex serializes every operation, which
/// gives the same per-key mutation discipline the Mongo store gets from
/// conditional updates.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    codes: HashMap<(String, Purpose), OtpRecord>,
    tokens: HashMap<String, ResetTokenRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn otp_is_active(record: &OtpRecord) -> bool {
    record.consumed_at.is_none() && !record.is_expired() && record.attempts < record.max_attempts
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn put(&self, record: OtpRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        // Replacing the map entry is the supersede: the old record can
        // never be found again under this key.
        inner
            .codes
            .insert((record.subject.clone(), record.purpose), record);
        Ok(())
    }

    async fn get_active(&self, subject: &str, purpose: Purpose) -> Result<Option<OtpRecord>> {
        let inner = self.inner.lock().await;
        let record = inner
            .codes
            .get(&(subject.to_string(), purpose))
            .filter(|r| r.consumed_at.is_none())
            .cloned();
        Ok(record)
    }

    async fn increment_attempts(&self, subject: &str, purpose: Purpose) -> Result<i32> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .codes
            .get_mut(&(subject.to_string(), purpose))
            .filter(|r| otp_is_active(r))
            .ok_or(AppError::StaleCredential)?;
        record.attempts += 1;
        Ok(record.attempts)
    }

    async fn mark_consumed(&self, subject: &str, purpose: Purpose) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .codes
            .get_mut(&(subject.to_string(), purpose))
            .filter(|r| r.consumed_at.is_none() && !r.is_expired())
            .ok_or(AppError::StaleCredential)?;
        record.consumed_at = Some(DateTime::now());
        Ok(())
    }

    async fn put_token(&self, record: ResetTokenRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.tokens.insert(record.token_id.clone(), record);
        Ok(())
    }

    async fn get_token(&self, token_id: &str) -> Result<Option<ResetTokenRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.tokens.get(token_id).cloned())
    }

    async fn mark_token_used(&self, token_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .tokens
            .get_mut(token_id)
            .filter(|r| r.used_at.is_none() && !r.is_expired())
            .ok_or(AppError::StaleCredential)?;
        record.used_at = Some(DateTime::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(subject: &str, code: &str, ttl_minutes: i64) -> OtpRecord {
        OtpRecord::new(
            subject,
            code,
            Purpose::PasswordReset,
            Duration::minutes(ttl_minutes),
            3,
        )
    }

    #[tokio::test]
    async fn put_supersedes_prior_record() {
        let store = MemoryCredentialStore::new();
        store.put(record("+15551234567", "111111", 10)).await.unwrap();
        store.put(record("+15551234567", "222222", 10)).await.unwrap();

        let active = store
            .get_active("+15551234567", Purpose::PasswordReset)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.code, "222222");
    }

    #[tokio::test]
    async fn increment_stops_at_max_attempts() {
        let store = MemoryCredentialStore::new();
        store.put(record("+15551234567", "111111", 10)).await.unwrap();

        for expected in 1..=3 {
            let attempts = store
                .increment_attempts("+15551234567", Purpose::PasswordReset)
                .await
                .unwrap();
            assert_eq!(attempts, expected);
        }

        let err = store
            .increment_attempts("+15551234567", Purpose::PasswordReset)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StaleCredential));
    }

    #[tokio::test]
    async fn consumed_record_rejects_further_mutation() {
        let store = MemoryCredentialStore::new();
        store.put(record("+15551234567", "111111", 10)).await.unwrap();
        store
            .mark_consumed("+15551234567", Purpose::PasswordReset)
            .await
            .unwrap();

        assert!(store
            .get_active("+15551234567", Purpose::PasswordReset)
            .await
            .unwrap()
            .is_none());
        let err = store
            .increment_attempts("+15551234567", Purpose::PasswordReset)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StaleCredential));
    }

    #[tokio::test]
    async fn expired_record_rejects_consume() {
        let store = MemoryCredentialStore::new();
        store.put(record("+15551234567", "111111", -1)).await.unwrap();

        let err = store
            .mark_consumed("+15551234567", Purpose::PasswordReset)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StaleCredential));
    }

    #[tokio::test]
    async fn token_marks_used_exactly_once() {
        let store = MemoryCredentialStore::new();
        let token = ResetTokenRecord::new("jti-1", "user-1", Purpose::EmailReset, Duration::hours(1));
        store.put_token(token).await.unwrap();

        store.mark_token_used("jti-1").await.unwrap();
        let err = store.mark_token_used("jti-1").await.unwrap_err();
        assert!(matches!(err, AppError::StaleCredential));

        let record = store.get_token("jti-1").await.unwrap().unwrap();
        assert!(record.used_at.is_some());
    }
}
