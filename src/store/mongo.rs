use async_trait::async_trait;
use mongodb::{
    bson::{doc, DateTime},
    options::ReturnDocument,
    Collection, Database,
};

use crate::errors::{AppError, Result};
use crate::models::credential::{OtpRecord, Purpose, ResetTokenRecord};
use crate::store::CredentialStore;

const OTP_COLLECTION: &str = "otp_codes";
const TOKEN_COLLECTION: &str = "reset_tokens";

/// MongoDB-backed credential store. All mutations are filtered updates so
/// the "still active" condition and the write happen in one server-side
/// step; a lost race shows up as zero matched documents.
#[derive(Clone)]
pub struct MongoCredentialStore {
    db: Database,
}

impl MongoCredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn otp_codes(&self) -> Collection<OtpRecord> {
        self.db.collection(OTP_COLLECTION)
    }

    fn reset_tokens(&self) -> Collection<ResetTokenRecord> {
        self.db.collection(TOKEN_COLLECTION)
    }
}

#[async_trait]
impl CredentialStore for MongoCredentialStore {
    async fn put(&self, record: OtpRecord) -> Result<()> {
        self.otp_codes()
            .update_many(
                doc! {
                    "subject": &record.subject,
                    "purpose": record.purpose.as_str(),
                    "consumed_at": null,
                    "superseded": false,
                },
                doc! { "$set": { "superseded": true } },
            )
            .await?;

        self.otp_codes().insert_one(&record).await?;
        Ok(())
    }

    async fn get_active(&self, subject: &str, purpose: Purpose) -> Result<Option<OtpRecord>> {
        let record = self
            .otp_codes()
            .find_one(doc! {
                "subject": subject,
                "purpose": purpose.as_str(),
                "consumed_at": null,
                "superseded": false,
            })
            .sort(doc! { "issued_at": -1 })
            .await?;

        Ok(record)
    }

    async fn increment_attempts(&self, subject: &str, purpose: Purpose) -> Result<i32> {
        let updated = self
            .otp_codes()
            .find_one_and_update(
                doc! {
                    "subject": subject,
                    "purpose": purpose.as_str(),
                    "consumed_at": null,
                    "superseded": false,
                    "expires_at": { "$gt": DateTime::now() },
                    "$expr": { "$lt": ["$attempts", "$max_attempts"] },
                },
                doc! { "$inc": { "attempts": 1 } },
            )
            .return_document(ReturnDocument::After)
            .await?;

        match updated {
            Some(record) => Ok(record.attempts),
            None => Err(AppError::StaleCredential),
        }
    }

    async fn mark_consumed(&self, subject: &str, purpose: Purpose) -> Result<()> {
        let result = self
            .otp_codes()
            .update_one(
                doc! {
                    "subject": subject,
                    "purpose": purpose.as_str(),
                    "consumed_at": null,
                    "superseded": false,
                    "expires_at": { "$gt": DateTime::now() },
                },
                doc! { "$set": { "consumed_at": DateTime::now() } },
            )
            .await?;

        if result.modified_count == 0 {
            return Err(AppError::StaleCredential);
        }
        Ok(())
    }

    async fn put_token(&self, record: ResetTokenRecord) -> Result<()> {
        self.reset_tokens().insert_one(&record).await?;
        Ok(())
    }

    async fn get_token(&self, token_id: &str) -> Result<Option<ResetTokenRecord>> {
        let record = self
            .reset_tokens()
            .find_one(doc! { "token_id": token_id })
            .await?;
        Ok(record)
    }

    async fn mark_token_used(&self, token_id: &str) -> Result<()> {
        let result = self
            .reset_tokens()
            .update_one(
                doc! {
                    "token_id": token_id,
                    "used_at": null,
                    "expires_at": { "$gt": DateTime::now() },
                },
                doc! { "$set": { "used_at": DateTime::now() } },
            )
            .await?;

        if result.modified_count == 0 {
            return Err(AppError::StaleCredential);
        }
        Ok(())
    }
}
