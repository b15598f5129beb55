use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{CreateReportRequest, ErrorResponse, ListReportsQuery};
use crate::routes::{bad_request, server_error, AppState};
use crate::services::StoreError;

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 200;

/// Configure all report-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/reports", web::post().to(create_report))
        .route("/reports", web::get().to(list_reports))
        .route("/reports/symptoms", web::get().to(list_symptoms))
        .route("/reports/tags", web::get().to(list_tags))
        .route("/reports/{id}", web::get().to(get_report));
}

/// Create report endpoint
///
/// POST /api/v1/reports
///
/// Request body:
/// ```json
/// {
///   "title": "string",
///   "description": "string",
///   "location": "40.0,-75.0",
///   "businessName": "string",
///   "symptoms": [1, 2],
///   "tags": [3]
/// }
/// ```
///
/// The report is committed before alerting starts, and alerting runs in
/// the background: its outcome never changes this response.
async fn create_report(
    state: web::Data<AppState>,
    req: web::Json<CreateReportRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for create_report request: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    let severity = state
        .classifier
        .classify_or_default(&req.classification_text())
        .await;

    let report = match state.postgres.create_report(&req, severity).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Failed to create report: {}", e);
            return server_error("Failed to create report", e.to_string());
        }
    };

    tracing::info!("Created report {} with severity {}", report.id, report.severity);

    let trigger = state.trigger.clone();
    let event = report.event();
    actix_web::rt::spawn(async move {
        match trigger.on_report_created(&event).await {
            Ok(outcomes) => {
                let delivered = outcomes.iter().filter(|o| o.delivered()).count();
                tracing::info!(
                    "Alerts for report {}: {} delivered, {} failed",
                    event.id,
                    delivered,
                    outcomes.len() - delivered
                );
            }
            Err(e) => tracing::error!("Alerting failed for report {}: {}", event.id, e),
        }
    });

    HttpResponse::Created().json(report)
}

/// List reports, newest first
///
/// GET /api/v1/reports?limit={limit}
async fn list_reports(
    state: web::Data<AppState>,
    query: web::Query<ListReportsQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);

    match state.postgres.list_reports(i64::from(limit)).await {
        Ok(reports) => HttpResponse::Ok().json(reports),
        Err(e) => {
            tracing::error!("Failed to list reports: {}", e);
            server_error("Failed to list reports", e.to_string())
        }
    }
}

/// GET /api/v1/reports/{id}
async fn get_report(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let report_id = path.into_inner();

    match state.postgres.get_report(report_id).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(StoreError::NotFound(message)) => HttpResponse::NotFound().json(ErrorResponse {
            error: "Report not found".to_string(),
            message,
            status_code: 404,
        }),
        Err(e) => {
            tracing::error!("Failed to fetch report {}: {}", report_id, e);
            server_error("Failed to fetch report", e.to_string())
        }
    }
}

/// GET /api/v1/reports/symptoms
async fn list_symptoms(state: web::Data<AppState>) -> impl Responder {
    match state.postgres.list_symptoms().await {
        Ok(symptoms) => HttpResponse::Ok().json(symptoms),
        Err(e) => {
            tracing::error!("Failed to list symptoms: {}", e);
            server_error("Failed to list symptoms", e.to_string())
        }
    }
}

/// GET /api/v1/reports/tags
async fn list_tags(state: web::Data<AppState>) -> impl Responder {
    match state.postgres.list_tags().await {
        Ok(tags) => HttpResponse::Ok().json(tags),
        Err(e) => {
            tracing::error!("Failed to list tags: {}", e);
            server_error("Failed to list tags", e.to_string())
        }
    }
}
