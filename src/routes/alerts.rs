use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::{parse_query_coordinate, LocationError};
use crate::models::{NearbyReportsQuery, SubscribeRequest, SubscribeResponse};
use crate::routes::{bad_request, server_error, AppState};

/// Longest lookback accepted by the nearby query (ten years)
const MAX_QUERY_AGE_HOURS: u32 = 24 * 365 * 10;

/// Configure all alert-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/alerts/subscribe", web::post().to(subscribe))
        .route("/alerts/subscriptions", web::get().to(list_subscriptions))
        .route("/alerts/nearby-reports", web::get().to(nearby_reports));
}

/// Subscribe endpoint
///
/// POST /api/v1/alerts/subscribe
///
/// Request body:
/// ```json
/// {
///   "username": "string",
///   "email": "string",
///   "phone": "string",
///   "latitude": 40.0,
///   "longitude": -75.0
/// }
/// ```
async fn subscribe(
    state: web::Data<AppState>,
    req: web::Json<SubscribeRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for subscribe request: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    match state.postgres.create_subscription(&req).await {
        Ok(id) => HttpResponse::Created().json(SubscribeResponse {
            message: "Subscription successful".to_string(),
            id,
        }),
        Err(e) => {
            tracing::error!("Failed to create subscription for {}: {}", req.username, e);
            server_error("Failed to create subscription", e.to_string())
        }
    }
}

/// GET /api/v1/alerts/subscriptions
async fn list_subscriptions(state: web::Data<AppState>) -> impl Responder {
    match state.postgres.list_subscriptions().await {
        Ok(subscriptions) => HttpResponse::Ok().json(subscriptions),
        Err(e) => {
            tracing::error!("Failed to list subscriptions: {}", e);
            server_error("Failed to list subscriptions", e.to_string())
        }
    }
}

/// Nearby reports endpoint
///
/// GET /api/v1/alerts/nearby-reports?latitude={lat}&longitude={lon}&radius_km={km}&max_age_hours={h}
///
/// Returns recent reports within the radius, nearest first. Never sends
/// notifications.
async fn nearby_reports(
    state: web::Data<AppState>,
    query: web::Query<NearbyReportsQuery>,
) -> impl Responder {
    let origin = match parse_query_coordinate(query.latitude.as_deref(), query.longitude.as_deref()) {
        Ok(origin) => origin,
        Err(LocationError::Empty) => {
            return bad_request("Missing coordinates", "Latitude and longitude are required");
        }
        Err(LocationError::OutOfRange { .. }) => {
            return bad_request(
                "Invalid coordinates",
                "Latitude and longitude values are out of valid range",
            );
        }
        Err(_) => {
            return bad_request(
                "Invalid coordinates",
                "Latitude and longitude must be valid numbers",
            );
        }
    };

    let matcher = state.trigger.matcher();
    let radius_km = query.radius_km.unwrap_or(matcher.radius_km());
    if !(radius_km.is_finite() && radius_km > 0.0) {
        return bad_request("Invalid radius", "radius_km must be a positive number");
    }

    let max_age = match query.max_age_hours {
        Some(hours) if hours == 0 || hours > MAX_QUERY_AGE_HOURS => {
            return bad_request(
                "Invalid max age",
                format!("max_age_hours must be between 1 and {}", MAX_QUERY_AGE_HOURS),
            );
        }
        Some(hours) => chrono::Duration::hours(i64::from(hours)),
        None => matcher.recency(),
    };

    match state.trigger.nearby_reports(&origin, radius_km, max_age).await {
        Ok(nearby) => HttpResponse::Ok().json(nearby),
        Err(e) => {
            tracing::error!("Failed to query nearby reports: {}", e);
            server_error("Server error", e.to_string())
        }
    }
}
