//! Email notifications

use anyhow::Result;
use async_trait::async_trait;

pub mod smtp;
pub mod templates;

pub use smtp::SmtpNotifier;

/// A rendered HTML email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Delivers notifications to their recipient
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}
