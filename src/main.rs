use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use food_alerts::bootstrap;
use food_alerts::config::Settings;
use food_alerts::core::AlertTrigger;
use food_alerts::routes::{self, AppState};
use food_alerts::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, error};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Periodically re-run matching over recent reports
fn spawn_sweep_loop(trigger: Arc<AlertTrigger>, interval_secs: u64) {
    let max_age = trigger.matcher().recency();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        // First tick completes immediately; skip it so startup isn't a sweep
        interval.tick().await;

        loop {
            interval.tick().await;
            if let Err(e) = trigger.sweep(max_age).await {
                error!("Alert sweep failed: {}", e);
            }
        }
    });
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    telemetry::init_tracing(&settings.logging);

    info!("Starting food alerts service...");

    let postgres = bootstrap::connect_database(&settings).await.map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!(
        "PostgreSQL client initialized (max: {} connections)",
        settings.database.max_connections.unwrap_or(10)
    );

    // Classifier failure leaves it unavailable; the service still starts
    let classifier = Arc::new(bootstrap::init_classifier(&settings).await);

    let trigger = Arc::new(bootstrap::build_trigger(&settings, postgres.clone()));

    info!(
        "Alert trigger initialized (radius: {} km, recency: {} h)",
        settings.alerts.radius_km, settings.alerts.recency_hours
    );

    if let Some(interval_secs) = settings.alerts.sweep_interval_secs.filter(|s| *s > 0) {
        info!("Scheduling alert sweep every {}s", interval_secs);
        spawn_sweep_loop(trigger.clone(), interval_secs);
    }

    let app_state = AppState {
        postgres,
        trigger,
        classifier,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
