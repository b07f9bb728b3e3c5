use mongodb::{Client, Database};

use crate::config::AppConfig;
use crate::errors::Result;

pub async fn connect(config: &AppConfig) -> Result<Database> {
    let client = Client::with_uri_str(&config.database_url).await?;
    let db = client.database(&config.database_name);

    match db.list_collection_names().await {
        Ok(collections) => {
            tracing::info!(
                database = %config.database_name,
                collections = ?collections,
                "connected to MongoDB"
            );
        }
        Err(e) => {
            tracing::warn!(
                database = %config.database_name,
                error = %e,
                "database may not exist or is inaccessible"
            );
        }
    }

    Ok(db)
}
