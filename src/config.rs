use chrono::NaiveTime;
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::services::availability::ServiceHours;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Restaurant operating parameters: service hours, seating windows, fees.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RestaurantConfig {
    /// First bookable time of day, `HH:MM`
    #[serde(default = "default_opening_time")]
    #[validate(custom = "validate_clock_time")]
    pub opening_time: String,

    /// End of the service window, `HH:MM`
    #[serde(default = "default_closing_time")]
    #[validate(custom = "validate_clock_time")]
    pub closing_time: String,

    /// Latest bookable start time, `HH:MM`; at the closing time every slot before close is bookable
    #[serde(default = "default_last_seating")]
    #[validate(custom = "validate_clock_time")]
    pub last_seating: String,

    /// Booking grid in minutes
    #[serde(default = "default_slot_minutes")]
    #[validate(range(min = 1, max = 60))]
    pub slot_minutes: u32,

    /// How long a reservation occupies its table
    #[serde(default = "default_service_window_minutes")]
    #[validate(range(min = 15, max = 480))]
    pub service_window_minutes: u32,

    #[serde(default = "default_max_party_size")]
    #[validate(range(min = 1, max = 100))]
    pub max_party_size: i32,

    #[serde(default = "default_delivery_fee")]
    #[validate(custom = "validate_fee")]
    pub delivery_fee: Decimal,

    /// Minutes from checkout until the estimated delivery arrival
    #[serde(default = "default_delivery_eta_minutes")]
    #[validate(range(min = 1, max = 240))]
    pub delivery_eta_minutes: i64,

    #[serde(default = "default_takeout_fee")]
    #[validate(custom = "validate_fee")]
    pub takeout_fee: Decimal,

    /// Idle lifetime of a server-side session
    #[serde(default = "default_session_ttl_secs")]
    #[validate(range(min = 60))]
    pub session_ttl_secs: u64,
}

impl Default for RestaurantConfig {
    fn default() -> Self {
        Self {
            opening_time: default_opening_time(),
            closing_time: default_closing_time(),
            last_seating: default_last_seating(),
            slot_minutes: default_slot_minutes(),
            service_window_minutes: default_service_window_minutes(),
            max_party_size: default_max_party_size(),
            delivery_fee: default_delivery_fee(),
            delivery_eta_minutes: default_delivery_eta_minutes(),
            takeout_fee: default_takeout_fee(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl RestaurantConfig {
    /// Parsed service hours. Values are validated at load time; unparsable
    /// entries fall back to the built-in defaults.
    pub fn service_hours(&self) -> ServiceHours {
        let defaults = ServiceHours::default();
        ServiceHours {
            opening: parse_clock_time(&self.opening_time).unwrap_or(defaults.opening),
            closing: parse_clock_time(&self.closing_time).unwrap_or(defaults.closing),
            last_seating: parse_clock_time(&self.last_seating).unwrap_or(defaults.last_seating),
            slot_minutes: self.slot_minutes,
            window_minutes: self.service_window_minutes,
            max_party_size: self.max_party_size,
        }
    }

    fn validate_hours(&self, errors: &mut ValidationErrors) {
        let hours = self.service_hours();
        if !(hours.opening <= hours.last_seating && hours.last_seating <= hours.closing) {
            let mut err = ValidationError::new("service_hours");
            err.message =
                Some("opening_time <= last_seating <= closing_time must hold".into());
            errors.add("restaurant", err);
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 64 characters)
    #[validate(length(min = 64), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[validate(range(min = 60, max = 86400))]
    pub jwt_expiration: usize,

    /// Refresh token lifetime in seconds
    #[validate(range(min = 3600, max = 2592000))]
    pub refresh_token_expiration: usize,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Per-request timeout applied at the HTTP layer
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Default page size for paginated API responses
    #[serde(default = "default_api_page_size")]
    pub api_default_page_size: u64,

    /// Maximum page size allowed for paginated API responses
    #[serde(default = "default_api_max_page_size")]
    pub api_max_page_size: u64,

    /// JWT issuer name
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    #[serde(default)]
    #[validate]
    pub restaurant: RestaurantConfig,
}

impl AppConfig {
    /// Creates a new configuration with defaults for every optional setting
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        refresh_token_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            refresh_token_expiration,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            restaurant: RestaurantConfig::default(),
        }
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if self.api_default_page_size == 0 || self.api_default_page_size > self.api_max_page_size
        {
            let mut err = ValidationError::new("api_default_page_size");
            err.message = Some("api_default_page_size must be in 1..=api_max_page_size".into());
            errors.add("api_default_page_size", err);
        }

        self.restaurant.validate_hours(&mut errors);

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_api_page_size() -> u64 {
    20
}

fn default_api_max_page_size() -> u64 {
    100
}

fn default_auth_issuer() -> String {
    "restaurant-api".to_string()
}

fn default_auth_audience() -> String {
    "restaurant-clients".to_string()
}

fn default_opening_time() -> String {
    "15:00".to_string()
}

fn default_closing_time() -> String {
    "23:00".to_string()
}

fn default_last_seating() -> String {
    "23:00".to_string()
}

fn default_slot_minutes() -> u32 {
    15
}

fn default_service_window_minutes() -> u32 {
    120
}

fn default_max_party_size() -> i32 {
    20
}

fn default_delivery_fee() -> Decimal {
    dec!(50.00)
}

fn default_delivery_eta_minutes() -> i64 {
    15
}

fn default_takeout_fee() -> Decimal {
    dec!(0.00)
}

fn default_session_ttl_secs() -> u64 {
    86_400
}

/// Parses an `HH:MM` wall-clock time
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

fn validate_clock_time(value: &str) -> Result<(), ValidationError> {
    if parse_clock_time(value).is_some() {
        Ok(())
    } else {
        let mut err = ValidationError::new("clock_time");
        err.message = Some("Must be a time of day formatted as HH:MM".into());
        Err(err)
    }
}

fn validate_fee(fee: &Decimal) -> Result<(), ValidationError> {
    if fee.is_sign_negative() {
        let mut err = ValidationError::new("fee");
        err.message = Some("Fees cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "12345", "abcdef"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some(
            "JWT secret appears to be weak; use a cryptographically strong random string".into(),
        );
        return Err(err);
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must have at least 10 unique characters for adequate entropy".into());
        return Err(err);
    }

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("restaurant_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Loads configuration from an explicit directory and profile
pub fn load_config_from(dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    // jwt_secret has no default; it must come from a file or APP__JWT_SECRET
    let config = Config::builder()
        .set_default("database_url", "sqlite://restaurant.db?mode=rwc")?
        .set_default("jwt_expiration", 3600)?
        .set_default("refresh_token_expiration", 604800)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a random string of at least 64 characters.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SECRET: &str =
        "kq83HdPz0vLw5TnX2bGmYcR7sJf4UeA9iKoN1tVhZyQx6WpMjBrDlEaSgC_-+=!@";

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            SECRET.into(),
            3600,
            86_400,
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://ecag.example".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn inverted_service_hours_are_rejected() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.restaurant.last_seating = "23:30".into();
        let err = cfg.validate_additional_constraints().unwrap_err();
        assert!(err.errors().contains_key("restaurant"));
    }

    #[test]
    fn default_restaurant_settings_match_service_window() {
        let hours = RestaurantConfig::default().service_hours();
        assert_eq!(hours.opening, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(hours.closing, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
        assert_eq!(hours.last_seating, NaiveTime::from_hms_opt(23, 0, 0).unwrap());
        assert_eq!(hours.slot_minutes, 15);
        assert_eq!(hours.window_minutes, 120);
    }

    #[test]
    fn weak_jwt_secrets_are_rejected() {
        assert!(validate_jwt_secret("short").is_err());
        assert!(validate_jwt_secret(&"a".repeat(80)).is_err());
        assert!(validate_jwt_secret(&format!("{}password", SECRET)).is_err());
        assert!(validate_jwt_secret(SECRET).is_ok());
    }

    #[test]
    fn loads_layered_file_configuration() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
            database_url = "sqlite::memory:"
            jwt_secret = "{SECRET}"
            port = 9090

            [restaurant]
            delivery_fee = 65.5
            last_seating = "21:45"
            "#
        )
        .unwrap();

        let cfg = load_config_from(dir.path(), "development").unwrap();
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.restaurant.delivery_fee, dec!(65.5));
        assert_eq!(cfg.restaurant.last_seating, "21:45");
        assert_eq!(cfg.restaurant.opening_time, "15:00");
    }

    #[test]
    fn missing_jwt_secret_is_a_load_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = load_config_from(dir.path(), "development");
        assert!(matches!(result, Err(AppConfigError::Load(_))));
    }
}
