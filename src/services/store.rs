use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Report, Subscription};

/// Errors that can occur when reading or writing persisted records
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to persisted reports
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Reports created at or after `since`, newest first
    async fn reports_since(&self, since: DateTime<Utc>) -> Result<Vec<Report>, StoreError>;
}

/// Read access to persisted subscriptions
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;
}
