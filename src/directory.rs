use async_trait::async_trait;
use chrono::Utc;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Collection, Database,
};
use tokio::sync::Mutex;

use crate::errors::{AppError, Result};
use crate::models::user::User;

const USERS_COLLECTION: &str = "users";

/// External user directory as seen by the recovery flow: lookups by
/// contact address, plus the one mutation recovery is allowed to make.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn update_password_hash(&self, user_id: &str, password_hash: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct MongoUserDirectory {
    db: Database,
}

impl MongoUserDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS_COLLECTION)
    }
}

#[async_trait]
impl UserDirectory for MongoUserDirectory {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let user = self.users().find_one(doc! { "phone": phone }).await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self.users().find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    async fn update_password_hash(&self, user_id: &str, password_hash: &str) -> Result<()> {
        let id = ObjectId::parse_str(user_id)
            .map_err(|_| AppError::DirectoryUpdate(format!("invalid user id: {}", user_id)))?;

        let result = self
            .users()
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "password_hash": password_hash,
                        "updated_at": DateTime::now(),
                    }
                },
            )
            .await
            .map_err(|e| AppError::DirectoryUpdate(e.to_string()))?;

        if result.matched_count == 0 {
            return Err(AppError::DirectoryUpdate(format!(
                "no user with id {}",
                user_id
            )));
        }
        Ok(())
    }
}

/// In-memory directory used by the test suites.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<Vec<User>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, user: User) {
        self.users.lock().await.push(user);
    }

    pub async fn get(&self, user_id: &str) -> Option<User> {
        let users = self.users.lock().await;
        users
            .iter()
            .find(|u| u.id_hex().as_deref() == Some(user_id))
            .cloned()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.phone == phone).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_password_hash(&self, user_id: &str, password_hash: &str) -> Result<()> {
        let mut users = self.users.lock().await;
        let user = users
            .iter_mut()
            .find(|u| u.id_hex().as_deref() == Some(user_id))
            .ok_or_else(|| AppError::DirectoryUpdate(format!("no user with id {}", user_id)))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }
}
