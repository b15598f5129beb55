use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a report
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReportRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub location: Option<String>,
    #[validate(length(max = 255))]
    #[serde(alias = "business_name", rename = "businessName", default)]
    pub business_name: Option<String>,
    /// Symptom ids; unknown ids are ignored
    #[serde(default)]
    pub symptoms: Vec<i64>,
    /// Tag ids; unknown ids are ignored
    #[serde(default)]
    pub tags: Vec<i64>,
}

impl CreateReportRequest {
    /// Text handed to the severity classifier
    pub fn classification_text(&self) -> String {
        format!("{}\n{}", self.title, self.description)
    }
}

/// Request to register a subscription
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 15))]
    #[serde(default)]
    pub phone: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Query string for the nearby reports lookup
///
/// Coordinates arrive as raw strings so a malformed value can be reported
/// with a precise message rather than a generic query error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NearbyReportsQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub radius_km: Option<f64>,
    pub max_age_hours: Option<u32>,
}

/// Query string for listing reports
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListReportsQuery {
    pub limit: Option<u32>,
}
