// Route exports
pub mod alerts;
pub mod reports;

use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use crate::core::AlertTrigger;
use crate::models::{ErrorResponse, HealthResponse};
use crate::services::{PostgresClient, SeverityClassifier};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub postgres: Arc<PostgresClient>,
    pub trigger: Arc<AlertTrigger>,
    pub classifier: Arc<SeverityClassifier>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(reports::configure)
            .configure(alerts::configure),
    );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };
    let classifier = if state.classifier.is_ready() { "ready" } else { "unavailable" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        classifier: classifier.to_string(),
        timestamp: chrono::Utc::now(),
    })
}

pub(crate) fn bad_request(error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: 400,
    })
}

pub(crate) fn server_error(error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: 500,
    })
}
