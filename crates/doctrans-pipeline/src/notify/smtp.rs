//! SMTP relay delivery (Amazon SES SMTP interface)

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, instrument};

use super::{Notification, Notifier};
use crate::config::MailConfig;

/// [`Notifier`] sending through an SMTP relay with STARTTLS
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .with_context(|| format!("Invalid SMTP relay: {}", config.smtp_server))?
            .port(config.smtp_port);

        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid sender address: {}", config.from))?;

        info!(
            server = %config.smtp_server,
            port = config.smtp_port,
            "SMTP notifier initialized"
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[instrument(skip_all, fields(subject = %notification.subject))]
    async fn send(&self, notification: &Notification) -> Result<()> {
        let to = notification
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid recipient address: {}", notification.to))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&notification.subject)
            .header(ContentType::TEXT_HTML)
            .body(notification.html_body.clone())
            .context("Failed to build email")?;

        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;

        info!("Email sent to {}", notification.to);

        Ok(())
    }
}
