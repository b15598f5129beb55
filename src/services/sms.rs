use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::core::dispatcher::{AlertMessage, Notifier, NotifyError};
use crate::models::Channel;

/// Messaging provider client (Twilio-compatible REST API)
pub struct SmsClient {
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    client: Client,
}

impl SmsClient {
    pub fn new(
        base_url: String,
        account_sid: String,
        auth_token: String,
        from_number: String,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            account_sid,
            auth_token,
            from_number,
            client,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[async_trait]
impl Notifier for SmsClient {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(&self, to: &str, message: &AlertMessage) -> Result<(), NotifyError> {
        let form = [
            ("To", to),
            ("From", self.from_number.as_str()),
            ("Body", message.short_body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(NotifyError::ProviderError(format!(
                "Failed to send SMS: {} - {}",
                status, body
            )));
        }

        tracing::debug!("SMS accepted for {}", to);

        Ok(())
    }
}
