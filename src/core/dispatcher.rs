use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt as _};
use futures::stream::{self, StreamExt as _};
use thiserror::Error;

use crate::models::{Channel, DispatchOutcome, DispatchStatus, ReportEvent, Subscription};

/// Errors a delivery channel can report for a single send
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("provider rejected message: {0}")]
    ProviderError(String),

    #[error("{0} channel is not configured")]
    NotConfigured(Channel),
}

/// Alert content derived from a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
    pub short_body: String,
}

impl AlertMessage {
    pub fn for_report(event: &ReportEvent) -> Self {
        let mut body = format!(
            "A food-related alert was reported near your area: {}\n\n{}",
            event.title, event.description
        );
        if let Some(business) = event.business_name.as_deref().filter(|b| !b.is_empty()) {
            body.push_str(&format!("\n\nBusiness: {}", business));
        }

        Self {
            subject: format!("Nearby Alert: {}", event.title),
            body,
            short_body: format!(
                "New food safety alert near your location: {}\n{}",
                event.title, event.description
            ),
        }
    }
}

/// One delivery mechanism (email provider, SMS provider, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(&self, to: &str, message: &AlertMessage) -> Result<(), NotifyError>;
}

/// Fans an alert out to every channel of every matched subscriber
///
/// Each (subscriber, channel) send is its own unit of work with its own
/// deadline and captured result: a failing or hung provider only ever
/// affects the outcome of that one send.
#[derive(Clone)]
pub struct NotificationDispatcher {
    email: Option<Arc<dyn Notifier>>,
    sms: Option<Arc<dyn Notifier>>,
    max_concurrent: usize,
    send_timeout: Duration,
}

/// One (subscription, channel) delivery, owning everything it needs so the
/// resulting future is `'static` and can run on any executor thread
struct SendJob {
    subscription_id: i64,
    username: String,
    channel: Channel,
    recipient: String,
    notifier: Option<Arc<dyn Notifier>>,
}

impl SendJob {
    async fn run(
        self,
        report_id: i64,
        message: Arc<AlertMessage>,
        send_timeout: Duration,
    ) -> DispatchOutcome {
        let status = match &self.notifier {
            None => DispatchStatus::Failed {
                reason: NotifyError::NotConfigured(self.channel).to_string(),
            },
            Some(notifier) => {
                match tokio::time::timeout(send_timeout, notifier.send(&self.recipient, &message)).await {
                    Ok(Ok(())) => DispatchStatus::Delivered,
                    Ok(Err(e)) => DispatchStatus::Failed { reason: e.to_string() },
                    Err(_) => DispatchStatus::TimedOut,
                }
            }
        };

        let outcome = DispatchOutcome {
            report_id,
            subscription_id: self.subscription_id,
            username: self.username,
            channel: self.channel,
            recipient: self.recipient,
            status,
        };
        log_outcome(&outcome);
        outcome
    }
}

impl NotificationDispatcher {
    pub fn new(
        email: Option<Arc<dyn Notifier>>,
        sms: Option<Arc<dyn Notifier>>,
        max_concurrent: usize,
        send_timeout: Duration,
    ) -> Self {
        for notifier in email.iter().chain(sms.iter()) {
            tracing::debug!("{} channel enabled", notifier.channel());
        }

        Self {
            email,
            sms,
            max_concurrent: max_concurrent.max(1),
            send_timeout,
        }
    }

    /// Send `event` to every subscription over every channel it registered
    ///
    /// Jobs are built up front; the returned future borrows nothing from
    /// the caller. Never fails. Outcomes come back in subscription order,
    /// email before SMS, regardless of completion order.
    pub fn dispatch<'a, I>(&self, event: &ReportEvent, matches: I) -> BoxFuture<'static, Vec<DispatchOutcome>>
    where
        I: IntoIterator<Item = &'a Subscription>,
    {
        let mut jobs = Vec::new();
        for subscription in matches {
            if let Some(to) = subscription.email_address() {
                jobs.push(self.job(subscription, Channel::Email, to));
            }
            if let Some(to) = subscription.phone_number() {
                jobs.push(self.job(subscription, Channel::Sms, to));
            }
        }

        if jobs.is_empty() {
            return future::ready(Vec::new()).boxed();
        }

        tracing::debug!("Dispatching report {} over {} sends", event.id, jobs.len());

        let report_id = event.id;
        let message = Arc::new(AlertMessage::for_report(event));
        let sends: Vec<BoxFuture<'static, DispatchOutcome>> = jobs
            .into_iter()
            .map(|job| job.run(report_id, message.clone(), self.send_timeout).boxed())
            .collect();

        stream::iter(sends)
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>()
            .boxed()
    }

    fn job(&self, subscription: &Subscription, channel: Channel, recipient: &str) -> SendJob {
        let notifier = match channel {
            Channel::Email => self.email.clone(),
            Channel::Sms => self.sms.clone(),
        };

        SendJob {
            subscription_id: subscription.id,
            username: subscription.username.clone(),
            channel,
            recipient: recipient.to_string(),
            notifier,
        }
    }
}

fn log_outcome(outcome: &DispatchOutcome) {
    match &outcome.status {
        DispatchStatus::Delivered => tracing::info!(
            report_id = outcome.report_id,
            username = %outcome.username,
            channel = %outcome.channel,
            "Alert delivered"
        ),
        DispatchStatus::Failed { reason } => tracing::warn!(
            report_id = outcome.report_id,
            username = %outcome.username,
            channel = %outcome.channel,
            "Alert delivery failed: {}",
            reason
        ),
        DispatchStatus::TimedOut => tracing::warn!(
            report_id = outcome.report_id,
            username = %outcome.username,
            channel = %outcome.channel,
            "Alert delivery timed out"
        ),
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("email", &self.email.is_some())
            .field("sms", &self.sms.is_some())
            .field("max_concurrent", &self.max_concurrent)
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}
