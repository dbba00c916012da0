use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::{
    transport::smtp::authentication::Credentials,
    transport::smtp::client::{Tls, TlsParameters},
    Message, SmtpTransport, Transport,
};
use tracing::info;

use crate::config::EmailConfig;
use crate::domain::notification_service::{NotificationSender, OutgoingEmail};

/// Delivers notifications over SMTP with STARTTLS
#[derive(Clone)]
pub struct SmtpNotificationSender {
    from: Mailbox,
    transport: SmtpTransport,
}

impl SmtpNotificationSender {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        info!("📧 Initializing email service for SMTP server: {}:{}", config.smtp_server, config.smtp_port);

        let tls_params = TlsParameters::new(config.smtp_server.clone())
            .context("Failed to create TLS parameters")?;

        let transport = SmtpTransport::relay(&config.smtp_server)
            .context("Failed to create SMTP relay")?
            .port(config.smtp_port)
            .tls(Tls::Required(tls_params))
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();

        let from = config
            .from_email
            .parse::<Mailbox>()
            .context("Failed to parse from email")?;

        info!("📧 Email service initialized successfully");
        Ok(Self { from, transport })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(email.to.parse::<Mailbox>().context("Failed to parse recipient email")?)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .context("Failed to build email")
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = self.build_message(email)?;
        let transport = self.transport.clone();

        // The SMTP transport is blocking
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .context("Email delivery task failed")?
            .context("Failed to send email")?;

        info!("📧 Sent \"{}\" to {}", email.subject, email.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.com".to_string(),
            username: "pulse".to_string(),
            password: "secret".to_string(),
            from_email: "Student Pulse <pulse@example.com>".to_string(),
            ..EmailConfig::default()
        }
    }

    #[test]
    fn test_message_builds_for_valid_recipient() {
        let sender = SmtpNotificationSender::new(&config()).expect("Failed to create sender");
        let email = OutgoingEmail {
            to: "student@example.com".to_string(),
            subject: "Keep it up".to_string(),
            text_body: "plain".to_string(),
            html_body: "<p>html</p>".to_string(),
        };
        assert!(sender.build_message(&email).is_ok());
    }

    #[test]
    fn test_invalid_recipient_is_an_error() {
        let sender = SmtpNotificationSender::new(&config()).expect("Failed to create sender");
        let email = OutgoingEmail {
            to: "not an address".to_string(),
            subject: "s".to_string(),
            text_body: "t".to_string(),
            html_body: "h".to_string(),
        };
        assert!(sender.build_message(&email).is_err());
    }

    #[test]
    fn test_invalid_from_address_is_rejected() {
        let mut bad = config();
        bad.from_email = "nobody".to_string();
        assert!(SmtpNotificationSender::new(&bad).is_err());
    }
}
