use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Output format selected by `logging.format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Text,
}

impl LogFormat {
    /// Unknown values fall back to plain single-line text
    pub fn from_setting(format: &str) -> Self {
        match format.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Text,
        }
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match LogFormat::from_setting(&logging.format) {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
        LogFormat::Text => subscriber.init(),
    }
}
