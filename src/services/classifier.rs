use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::SeverityLevel;

/// Errors that can occur when classifying report text
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unknown hazard class id: {0}")]
    UnknownClass(usize),
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    class_id: usize,
}

/// Outcome of the one-time classifier initialization
#[derive(Debug)]
enum ClassifierState {
    Ready { labels: Vec<String> },
    Unavailable { reason: String },
}

/// Hazard classifier backed by a remote inference service
///
/// The hazard label set is fetched once at startup. If that fails the
/// classifier stays in the unavailable state for the life of the process
/// and every [`SeverityClassifier::classify`] call errors, so callers fall
/// back to the default severity.
#[derive(Debug)]
pub struct SeverityClassifier {
    endpoint: String,
    client: Client,
    state: ClassifierState,
}

impl SeverityClassifier {
    /// Load the label set from `{endpoint}/labels`; never fails
    pub async fn initialize(endpoint: String, timeout: Duration) -> Self {
        let client = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => return Self::unavailable(format!("Failed to create HTTP client: {}", e)),
        };

        let state = match fetch_labels(&client, &endpoint).await {
            Ok(labels) if !labels.is_empty() => {
                tracing::info!("Severity classifier ready with {} hazard labels", labels.len());
                ClassifierState::Ready { labels }
            }
            Ok(_) => ClassifierState::Unavailable {
                reason: "inference service returned no labels".to_string(),
            },
            Err(e) => {
                tracing::error!("Severity classifier failed to initialize: {}", e);
                ClassifierState::Unavailable { reason: e.to_string() }
            }
        };

        Self {
            endpoint,
            client,
            state,
        }
    }

    /// A classifier that was never configured
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            endpoint: String::new(),
            client: Client::new(),
            state: ClassifierState::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ClassifierState::Ready { .. })
    }

    /// Classify free text into a severity level
    pub async fn classify(&self, text: &str) -> Result<SeverityLevel, ClassifierError> {
        let labels = match &self.state {
            ClassifierState::Ready { labels } => labels,
            ClassifierState::Unavailable { reason } => {
                return Err(ClassifierError::Unavailable(reason.clone()));
            }
        };

        let url = format!("{}/predict", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&PredictRequest { text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClassifierError::ApiError(format!(
                "Failed to classify text: {}",
                response.status()
            )));
        }

        let prediction: PredictResponse = response.json().await?;

        let label = labels
            .get(prediction.class_id)
            .ok_or(ClassifierError::UnknownClass(prediction.class_id))?;

        Ok(map_hazard_to_severity(label))
    }

    /// Classify, substituting the default severity on any failure
    pub async fn classify_or_default(&self, text: &str) -> SeverityLevel {
        match self.classify(text).await {
            Ok(severity) => severity,
            Err(e) => {
                tracing::warn!("Severity classification failed, using default: {}", e);
                SeverityLevel::default()
            }
        }
    }
}

async fn fetch_labels(client: &Client, endpoint: &str) -> Result<Vec<String>, ClassifierError> {
    let url = format!("{}/labels", endpoint.trim_end_matches('/'));

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(ClassifierError::ApiError(format!(
            "Failed to fetch labels: {}",
            response.status()
        )));
    }

    Ok(response.json().await?)
}

/// Map a hazard category label to a severity level
pub fn map_hazard_to_severity(hazard_label: &str) -> SeverityLevel {
    let label = hazard_label.to_lowercase();
    if label.contains("microbiological") || label.contains("allergen") {
        SeverityLevel::High
    } else if label.contains("chemical") {
        SeverityLevel::Medium
    } else {
        SeverityLevel::Low
    }
}
