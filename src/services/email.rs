use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::core::dispatcher::{AlertMessage, Notifier, NotifyError};
use crate::models::Channel;

/// Outbound email payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text_body: &'a str,
}

/// Transactional mail API client
///
/// Posts one JSON message per recipient to `{api_url}/email` with the
/// server token in a header.
pub struct EmailClient {
    api_url: String,
    api_token: String,
    from_address: String,
    client: Client,
}

impl EmailClient {
    pub fn new(
        api_url: String,
        api_token: String,
        from_address: String,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_url,
            api_token,
            from_address,
            client,
        })
    }
}

#[async_trait]
impl Notifier for EmailClient {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, to: &str, message: &AlertMessage) -> Result<(), NotifyError> {
        let url = format!("{}/email", self.api_url.trim_end_matches('/'));

        let payload = EmailRequest {
            from: &self.from_address,
            to,
            subject: &message.subject,
            text_body: &message.body,
        };

        let response = self
            .client
            .post(&url)
            .header("X-Server-Token", &self.api_token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(NotifyError::ProviderError(format!(
                "Failed to send email: {} - {}",
                status, body
            )));
        }

        tracing::debug!("Email accepted for {}", to);

        Ok(())
    }
}
