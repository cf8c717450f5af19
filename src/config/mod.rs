//! Configuration management
//!
//! YAML-based configuration with environment variable overrides, multiple
//! file locations, and defaults for every setting.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed for credentialed CORS (the SPA dev server); when unset
    /// CORS headers are not emitted.
    #[serde(default)]
    pub frontend_url: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            frontend_url: None,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Sliding session length; the cookie is reissued with this expiry on
    /// every authenticated request.
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: u64,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
    /// Set the cookie `Secure` attribute (disable for plain-HTTP dev setups)
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

fn default_session_ttl_days() -> u64 {
    3
}

fn default_password_min_length() -> usize {
    8
}

fn default_secure_cookies() -> bool {
    true
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output format
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
    #[default]
    Pretty,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/salon-admin")
}

fn default_log_prefix() -> String {
    "salon-admin".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Calendar/booking defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingConfig {
    /// Default slot grid spacing for availability queries
    #[serde(default = "default_slot_interval")]
    pub slot_interval_minutes: u32,
    /// Working day start, hour of day (UTC)
    #[serde(default = "default_day_start_hour")]
    pub day_start_hour: u32,
    /// Working day end, hour of day (UTC, exclusive)
    #[serde(default = "default_day_end_hour")]
    pub day_end_hour: u32,
}

fn default_slot_interval() -> u32 {
    30
}

fn default_day_start_hour() -> u32 {
    8
}

fn default_day_end_hour() -> u32 {
    20
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            slot_interval_minutes: default_slot_interval(),
            day_start_hour: default_day_start_hour(),
            day_end_hour: default_day_end_hour(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        // Check for config path override from environment
        let config_path = std::env::var("SALON_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = if let Some(ref path) = config_path {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_norway::from_str::<AppConfig>(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/salon-admin/config.yaml"),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SALON_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(url) = std::env::var("FRONTEND_URL") {
            self.server.frontend_url = Some(url);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Validate the effective configuration
    fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            anyhow::bail!("auth.jwt_secret must be at least 32 characters");
        }
        if self.database.url.is_empty() {
            anyhow::bail!("database.url must be set");
        }
        if self.booking.day_start_hour >= self.booking.day_end_hour {
            anyhow::bail!("booking.day_start_hour must be before booking.day_end_hour");
        }
        if self.booking.day_end_hour > 23 {
            anyhow::bail!("booking.day_end_hour must be an hour of day (0-23)");
        }
        if self.booking.slot_interval_minutes == 0 {
            anyhow::bail!("booking.slot_interval_minutes must be positive");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig {
                jwt_secret: String::new(),
                session_ttl_days: default_session_ttl_days(),
                password_min_length: default_password_min_length(),
                secure_cookies: default_secure_cookies(),
            },
            database: DatabaseConfig {
                url: "sqlite://./data/salon-admin.db".to_string(),
                max_connections: default_max_connections(),
                connect_timeout_secs: default_connect_timeout(),
            },
            logging: LoggingConfig::default(),
            booking: BookingConfig::default(),
        }
    }
}
