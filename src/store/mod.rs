use async_trait::async_trait;

use crate::errors::Result;
use crate::models::credential::{OtpRecord, Purpose, ResetTokenRecord};

mod memory;
mod mongo;

pub use memory::MemoryCredentialStore;
pub use mongo::MongoCredentialStore;

/// Persistence contract for recovery credentials.
///
/// Every mutation is conditional on the record still being active
/// (unconsumed, unexpired, attempts below the ceiling); a mutation that
/// matches no active record fails with `StaleCredential`. This is what
/// keeps concurrent verifications from spending the same attempt twice.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new OTP record, superseding any prior active record for
    /// the same (subject, purpose).
    async fn put(&self, record: OtpRecord) -> Result<()>;

    /// Latest unconsumed, unsuperseded record for the key. Expired and
    /// attempts-exhausted records are still returned; the caller decides
    /// how to classify them.
    async fn get_active(&self, subject: &str, purpose: Purpose) -> Result<Option<OtpRecord>>;

    /// Spend one verification attempt and return the new attempt count.
    async fn increment_attempts(&self, subject: &str, purpose: Purpose) -> Result<i32>;

    /// Terminal success: set `consumed_at` on the active record.
    async fn mark_consumed(&self, subject: &str, purpose: Purpose) -> Result<()>;

    async fn put_token(&self, record: ResetTokenRecord) -> Result<()>;

    /// Point lookup by the token's id (`jti`).
    async fn get_token(&self, token_id: &str) -> Result<Option<ResetTokenRecord>>;

    /// Single-use enforcement: set `used_at` on a still-live token.
    async fn mark_token_used(&self, token_id: &str) -> Result<()>;
}
