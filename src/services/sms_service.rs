use std::time::Duration;

use reqwest::Client;

use crate::config::SmsConfig;
use crate::errors::{AppError, DeliveryError, Result};
use crate::services::notify::mask_phone;

const AFRICASTALKING_URL: &str = "https://api.africastalking.com/version1/messaging";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// SMS delivery provider. Variants share one `send` contract; which one
/// runs is decided by configuration at startup, never at call sites.
pub enum SmsProvider {
    /// Development provider: surfaces the message through the log instead
    /// of delivering it.
    Console,
    AfricasTalking(AfricasTalkingClient),
}

impl SmsProvider {
    pub fn from_config(config: &SmsConfig) -> Result<Self> {
        match config.provider.as_str() {
            "console" => Ok(SmsProvider::Console),
            "africastalking" => Ok(SmsProvider::AfricasTalking(AfricasTalkingClient::new(
                config,
            )?)),
            other => Err(AppError::configuration(format!(
                "Unknown SMS_PROVIDER '{}', expected 'console' or 'africastalking'",
                other
            ))),
        }
    }

    pub async fn send(&self, phone: &str, message: &str) -> std::result::Result<(), DeliveryError> {
        match self {
            SmsProvider::Console => {
                tracing::info!(to = %phone, body = %message, "console SMS");
                Ok(())
            }
            SmsProvider::AfricasTalking(client) => client.send(phone, message).await,
        }
    }
}

pub struct AfricasTalkingClient {
    api_key: String,
    username: String,
    from: String,
    client: Client,
}

impl AfricasTalkingClient {
    fn new(config: &SmsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| AppError::configuration(format!("SMS client build failed: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            username: config.username.clone(),
            from: config.from.clone(),
            client,
        })
    }

    async fn send(&self, phone: &str, message: &str) -> std::result::Result<(), DeliveryError> {
        let response = self
            .client
            .post(AFRICASTALKING_URL)
            .header("apiKey", &self.api_key)
            .header("Accept", "application/json")
            .form(&[
                ("username", self.username.as_str()),
                ("to", phone),
                ("message", message),
                ("from", self.from.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::Network(e.to_string())
                }
            })?;

        if response.status().is_success() {
            tracing::info!(to = %mask_phone(phone), "SMS dispatched");
            Ok(())
        } else {
            Err(DeliveryError::ProviderDeclined(format!(
                "SMS gateway returned status {}",
                response.status()
            )))
        }
    }
}
