use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Email, MailError, Mailer};

pub const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Delivers mail through the Resend HTTP API.
pub struct ResendMailer {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>) -> Result<Self, MailError> {
        Self::with_endpoint(RESEND_ENDPOINT, api_key)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, MailError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let res = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Sent email {:?} to {:?}", email.subject, email.to);
        Ok(())
    }
}
