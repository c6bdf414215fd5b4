//! Outbound email. Bodies are askama templates under `templates/emails`;
//! delivery goes through a [`Mailer`] so handlers never talk to Resend directly.

pub mod messages;
pub mod resend;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use resend::ResendMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("template error: {0}")]
    Render(#[from] askama::Error),

    #[error("network error: {0}")]
    Transport(String),

    #[error("mail provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Used when no provider key is configured. Nothing leaves the process.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        tracing::info!(
            "Email not sent (no provider configured): to={:?} subject={:?}",
            email.to,
            email.subject
        );
        Ok(())
    }
}

/// Send a notice whose failure must not fail the request.
pub async fn send_quietly(mailer: &dyn Mailer, email: Result<Email, MailError>) {
    let result = match email {
        Ok(email) => mailer.send(&email).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!("Failed to send notification email: {}", e);
    }
}
