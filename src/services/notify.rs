use crate::config::AppConfig;
use crate::errors::{DeliveryError, Result};
use crate::services::email_service::EmailProvider;
use crate::services::sms_service::SmsProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Sms,
    Email,
}

/// A short message bound for a user. SMS delivery uses only the body;
/// email uses subject and body.
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// Single delivery contract over both channels. Provider selection
/// happened at construction; callers never branch on vendor.
pub struct Notifier {
    sms: SmsProvider,
    email: EmailProvider,
}

impl Notifier {
    pub fn new(sms: SmsProvider, email: EmailProvider) -> Self {
        Self { sms, email }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            sms: SmsProvider::from_config(&config.sms)?,
            email: EmailProvider::from_config(&config.email)?,
        })
    }

    pub async fn send(
        &self,
        kind: ChannelKind,
        address: &str,
        note: &Notification,
    ) -> std::result::Result<(), DeliveryError> {
        match kind {
            ChannelKind::Sms => self.sms.send(address, &note.body).await,
            ChannelKind::Email => self.email.send(address, &note.subject, &note.body).await,
        }
    }
}

/// Last four digits only; everything else is masked for logs.
pub fn mask_phone(phone: &str) -> String {
    if phone.len() <= 4 {
        return "****".to_string();
    }
    format!("****{}", &phone[phone.len() - 4..])
}
