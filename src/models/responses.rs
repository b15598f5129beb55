use serde::{Deserialize, Serialize};
use crate::models::domain::Report;

/// A report near the queried point, with its resolved position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyReport {
    #[serde(flatten)]
    pub report: Report,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub classifier: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Subscribe response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub message: String,
    pub id: i64,
}
