//! Wiring shared by the HTTP service and the batch sweep binary

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AlertSettings, Settings};
use crate::core::{AlertTrigger, NotificationDispatcher, Notifier, ProximityMatcher};
use crate::services::{EmailClient, PostgresClient, SeverityClassifier, SmsClient, StoreError};

/// Connect to the database and run migrations
pub async fn connect_database(settings: &Settings) -> Result<Arc<PostgresClient>, StoreError> {
    let db = &settings.database;
    let client = PostgresClient::from_settings(
        &db.url,
        db.max_connections,
        db.min_connections,
        db.acquire_timeout_secs,
        db.idle_timeout_secs,
    )
    .await?;

    Ok(Arc::new(client))
}

/// Build the per-channel notifiers; unconfigured or broken channels are
/// left out and logged
pub fn build_dispatcher(settings: &Settings) -> NotificationDispatcher {
    let timeout = settings.alerts.send_timeout();

    let email: Option<Arc<dyn Notifier>> = match &settings.email {
        Some(email) => match EmailClient::new(
            email.api_url.clone(),
            email.api_token.clone(),
            email.from_address.clone(),
            timeout,
        ) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::error!("Email channel disabled: {}", e);
                None
            }
        },
        None => {
            tracing::warn!("No email settings, email alerts disabled");
            None
        }
    };

    let sms: Option<Arc<dyn Notifier>> = match &settings.sms {
        Some(sms) => match SmsClient::new(
            sms.base_url.clone(),
            sms.account_sid.clone(),
            sms.auth_token.clone(),
            sms.from_number.clone(),
            timeout,
        ) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::error!("SMS channel disabled: {}", e);
                None
            }
        },
        None => {
            tracing::warn!("No SMS settings, SMS alerts disabled");
            None
        }
    };

    NotificationDispatcher::new(email, sms, settings.alerts.max_concurrent_sends, timeout)
}

pub fn build_matcher(alerts: &AlertSettings) -> ProximityMatcher {
    ProximityMatcher::new(alerts.radius_km, alerts.recency())
}

/// Assemble the alert pipeline over the Postgres store
pub fn build_trigger(settings: &Settings, postgres: Arc<PostgresClient>) -> AlertTrigger {
    AlertTrigger::new(
        postgres.clone(),
        postgres,
        build_matcher(&settings.alerts),
        build_dispatcher(settings),
    )
}

/// Run the process-wide classifier initialization
pub async fn init_classifier(settings: &Settings) -> SeverityClassifier {
    match &settings.classifier {
        Some(classifier) => {
            SeverityClassifier::initialize(
                classifier.endpoint.clone(),
                Duration::from_secs(classifier.timeout_secs),
            )
            .await
        }
        None => {
            tracing::warn!("No classifier settings, reports will get the default severity");
            SeverityClassifier::unavailable("classifier not configured")
        }
    }
}
