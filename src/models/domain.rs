use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::location::LocationError;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Validated (latitude, longitude) pair in degrees
///
/// The fields are private so every value in circulation has passed the
/// range check in [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        // NaN fails both range checks
        if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude)
            || !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude)
        {
            return Err(LocationError::OutOfRange { latitude, longitude });
        }

        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Severity label assigned to a report by the hazard classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "severity_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SeverityLevel::Low => "low",
            SeverityLevel::Medium => "medium",
            SeverityLevel::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A persisted food-safety incident report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Free-form `"<lat>,<lon>"` string as submitted; never trusted directly
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "businessName", default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub severity: SeverityLevel,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// The part of the report the alert pipeline reads
    pub fn event(&self) -> ReportEvent {
        ReportEvent {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            business_name: self.business_name.clone(),
            location: self.location.clone(),
            created_at: self.created_at,
        }
    }
}

/// Subset of a [`Report`] relevant to proximity matching and alert content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEvent {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A subscriber's registered location and delivery addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Email address, if present and not blank
    pub fn email_address(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Phone number, if present and not blank
    pub fn phone_number(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// A candidate that fell within the radius, with its resolved position
#[derive(Debug, Clone)]
pub struct MatchResult<T> {
    pub candidate: T,
    pub coordinate: Coordinate,
    pub distance_km: f64,
}

/// Delivery mechanism for a single subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Email => f.write_str("email"),
            Channel::Sms => f.write_str("sms"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchStatus {
    Delivered,
    Failed { reason: String },
    TimedOut,
}

/// Result of one send attempt to one subscriber over one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub report_id: i64,
    pub subscription_id: i64,
    pub username: String,
    pub channel: Channel,
    pub recipient: String,
    #[serde(flatten)]
    pub status: DispatchStatus,
}

impl DispatchOutcome {
    pub fn delivered(&self) -> bool {
        matches!(self.status, DispatchStatus::Delivered)
    }
}
