use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;
const CONFIG_DIR: &str = "config";
/// Variable name the web frontend has always used for the backend address.
const API_BASE_URL_VAR: &str = "API_BASE_URL";

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Backend root; promotions live under `{api_base_url}/promotions`.
    #[validate(custom = "validate_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,

    /// Where the signed-in session is stored. Defaults to the user's home.
    #[serde(default)]
    pub session_file: Option<PathBuf>,

    /// Explicit bearer token; wins over the stored session.
    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1))]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    #[validate(range(min = 1, max = 500))]
    pub max_page_size: u32,

    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            environment: default_environment(),
            request_timeout_secs: default_request_timeout_secs(),
            session_file: None,
            auth_token: None,
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            event_channel_capacity: default_event_channel_capacity(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.default_page_size > self.max_page_size {
            let mut err = ValidationError::new("default_page_size_above_max");
            err.message = Some("default_page_size cannot exceed max_page_size".into());
            errors.add("default_page_size", err);
        }

        if self.is_production() && self.api_base_url.starts_with("http://") {
            let mut err = ValidationError::new("api_base_url_insecure");
            err.message = Some("Production must talk to the promotions API over https".into());
            errors.add("api_base_url", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Runs field and cross-field validation.
    pub fn check(&self) -> Result<(), AppConfigError> {
        self.validate().map_err(|e| {
            error!("Configuration validation failed: {:?}", e);
            AppConfigError::Validation(e)
        })?;

        self.validate_additional_constraints().map_err(|e| {
            error!("Configuration validation failed: {:?}", e);
            AppConfigError::Validation(e)
        })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_page_size() -> u32 {
    crate::models::DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn validate_base_url(value: &str) -> Result<(), ValidationError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
        _ => {
            let mut err = ValidationError::new("api_base_url");
            err.message = Some("Must be an absolute http(s) URL".into());
            Err(err)
        }
    }
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

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("cinema_promotions={},promotions_cli={}", level, level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Loads application configuration from `./config`.
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
/// 5. `API_BASE_URL`
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let api_base_url = env::var(API_BASE_URL_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty());

    let app_config = build_config(config_dir, &run_env, api_base_url)?;
    app_config.check()?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

fn build_config(
    config_dir: &Path,
    run_env: &str,
    api_base_url: Option<String>,
) -> Result<AppConfig, AppConfigError> {
    let defaults = AppConfig::default();
    let mut builder = Config::builder()
        .set_default("api_base_url", defaults.api_base_url)?
        .set_default("environment", run_env)?
        .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
        .set_default("default_page_size", i64::from(defaults.default_page_size))?
        .set_default("max_page_size", i64::from(defaults.max_page_size))?
        .set_default("event_channel_capacity", defaults.event_channel_capacity as i64)?
        .set_default("log_level", defaults.log_level)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    if let Some(url) = api_base_url {
        builder = builder.set_override("api_base_url", url)?;
    }

    Ok(builder.build()?.try_deserialize()?)
}
