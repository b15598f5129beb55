//! One-shot reconciliation sweep: match every subscription against recent
//! reports and send alerts. Meant to be run from a scheduler.

use food_alerts::bootstrap;
use food_alerts::config::Settings;
use food_alerts::telemetry;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    telemetry::init_tracing(&settings.logging);

    let postgres = match bootstrap::connect_database(&settings).await {
        Ok(postgres) => postgres,
        Err(e) => {
            error!("Failed to connect to PostgreSQL: {}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    let trigger = bootstrap::build_trigger(&settings, postgres);

    match trigger.sweep(settings.alerts.recency()).await {
        Ok(summary) => {
            info!(
                "Checked {} reports: {} alerts delivered, {} failed",
                summary.reports_checked, summary.deliveries, summary.failures
            );
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Alert sweep failed: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}
