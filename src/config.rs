use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
    #[serde(default)]
    pub email: Option<EmailSettings>,
    #[serde(default)]
    pub sms: Option<SmsSettings>,
    #[serde(default)]
    pub classifier: Option<ClassifierSettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertSettings {
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default = "default_recency_hours")]
    pub recency_hours: u32,
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    /// Run the reconciliation sweep in-process at this interval
    pub sweep_interval_secs: Option<u64>,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            radius_km: default_radius_km(),
            recency_hours: default_recency_hours(),
            max_concurrent_sends: default_max_concurrent_sends(),
            send_timeout_secs: default_send_timeout_secs(),
            sweep_interval_secs: None,
        }
    }
}

impl AlertSettings {
    pub fn recency(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.recency_hours))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

fn default_radius_km() -> f64 { 5.0 }
fn default_recency_hours() -> u32 { 24 }
fn default_max_concurrent_sends() -> usize { 8 }
fn default_send_timeout_secs() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub api_url: String,
    pub api_token: String,
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsSettings {
    #[serde(default = "default_sms_base_url")]
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

fn default_sms_base_url() -> String { "https://api.twilio.com".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSettings {
    pub endpoint: String,
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_classifier_timeout_secs() -> u64 { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

const ENV_PREFIX: &str = "FOOD_ALERTS";

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with FOOD_ALERTS_)
    /// 5. DATABASE_URL, if set
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., FOOD_ALERTS__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
