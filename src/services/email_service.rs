use std::time::Duration;

use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::config::EmailConfig;
use crate::errors::{AppError, DeliveryError, Result};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Email delivery provider, selected by configuration like the SMS side.
pub enum EmailProvider {
    /// Development provider: logs the mail instead of delivering it.
    Console,
    Smtp(SmtpMailer),
}

impl EmailProvider {
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        match config.provider.as_str() {
            "console" => Ok(EmailProvider::Console),
            "smtp" => Ok(EmailProvider::Smtp(SmtpMailer::new(config)?)),
            other => Err(AppError::configuration(format!(
                "Unknown EMAIL_PROVIDER '{}', expected 'console' or 'smtp'",
                other
            ))),
        }
    }

    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), DeliveryError> {
        match self {
            EmailProvider::Console => {
                tracing::info!(to = %to, subject = %subject, body = %body, "console email");
                Ok(())
            }
            EmailProvider::Smtp(mailer) => mailer.send(to, subject, body).await,
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    fn new(config: &EmailConfig) -> Result<Self> {
        if config.smtp_host.trim().is_empty() {
            return Err(AppError::configuration(
                "SMTP_HOST must be set when EMAIL_PROVIDER is 'smtp'",
            ));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| AppError::configuration(format!("Invalid EMAIL_FROM address: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| {
                AppError::configuration(format!("Failed to configure SMTP transport: {}", e))
            })?
            .port(config.smtp_port)
            .timeout(Some(SEND_TIMEOUT));

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), DeliveryError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| DeliveryError::InvalidAddress(e.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| DeliveryError::ProviderDeclined(format!("message build failed: {}", e)))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        tracing::info!(subject = %subject, "email dispatched");
        Ok(())
    }
}
