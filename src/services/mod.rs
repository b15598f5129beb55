// Service exports
pub mod classifier;
pub mod email;
pub mod postgres;
pub mod sms;
pub mod store;

pub use classifier::{SeverityClassifier, ClassifierError, map_hazard_to_severity};
pub use email::EmailClient;
pub use postgres::PostgresClient;
pub use sms::SmsClient;
pub use store::{ReportStore, SubscriptionStore, StoreError};
