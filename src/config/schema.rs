//! Configuration schema types
//!
//! Defines the structure of `tally.toml`. Each section carries its own
//! `validate()`; `TallyConfig::validate` runs them all so a bad config fails
//! before any connection is opened.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};

/// Main Tally configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Gateway database connection
    pub database: DatabaseConfig,

    /// Analytics sink connection (file-level fallbacks; the settings row in
    /// the database overrides these once `tally register` has run)
    #[serde(default)]
    pub sink: SinkConfig,

    /// Export cycle settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TallyConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.database.validate()?;
        self.sink.validate()?;
        self.export.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Gateway database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub connection_string: String,

    /// Maximum pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Pool acquire timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,

    /// Statement timeout in seconds
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_seconds: u64,
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), String> {
        if self.connection_string.is_empty() {
            return Err("database.connection_string must not be empty".to_string());
        }
        if self.max_connections == 0 {
            return Err("database.max_connections must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Analytics sink configuration
///
/// All fields are optional at the file level because they may instead come
/// from the stored settings row; completeness is enforced when the effective
/// settings are resolved, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink API base URL (e.g. "https://api.sink.example")
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key sent as the `x-api-key` header
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Tenant slug used in the control API path
    #[serde(default)]
    pub tenant: Option<String>,

    /// Instance identifier used in the control API path
    #[serde(default)]
    pub instance_id: Option<String>,

    /// Timezone label stored alongside the connection settings
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            tenant: None,
            instance_id: None,
            timezone: default_timezone(),
        }
    }
}

impl SinkConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref endpoint) = self.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| format!("sink.endpoint is not a valid URL: {e}"))?;
        }
        if self.timezone.is_empty() {
            return Err("sink.timezone must not be empty".to_string());
        }
        Ok(())
    }
}

/// Export cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Minutes between scheduled export cycles
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Maximum usage rows fetched per day (silently truncates beyond this)
    #[serde(default = "default_row_limit")]
    pub row_limit: i64,

    /// Acquire the cross-process advisory lock before each cycle
    #[serde(default = "default_lock_enabled")]
    pub lock_enabled: bool,

    /// Retry policy for the signed-URL request
    #[serde(default)]
    pub retry: RetryConfig,

    /// Timeout for control-plane calls (signed URL, register, cursor) in seconds
    #[serde(default = "default_control_timeout")]
    pub control_timeout_seconds: u64,

    /// Timeout for the payload transfer in seconds
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_seconds: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            row_limit: default_row_limit(),
            lock_enabled: default_lock_enabled(),
            retry: RetryConfig::default(),
            control_timeout_seconds: default_control_timeout(),
            transfer_timeout_seconds: default_transfer_timeout(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.interval_minutes == 0 {
            return Err("export.interval_minutes must be at least 1".to_string());
        }
        if self.row_limit <= 0 {
            return Err("export.row_limit must be positive".to_string());
        }
        self.retry.validate()
    }
}

/// Retry configuration for transient sink failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Initial backoff delay in milliseconds; doubles each attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("export.retry.max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to a rolling local file
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for local log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation policy: "daily" or "hourly"
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if !["daily", "hourly"].contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be 'daily' or 'hourly'",
                self.local_rotation
            ));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> usize {
    4
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_statement_timeout() -> u64 {
    60
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_row_limit() -> i64 {
    100_000
}

fn default_lock_enabled() -> bool {
    true
}

fn default_control_timeout() -> u64 {
    30
}

fn default_transfer_timeout() -> u64 {
    120
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> TallyConfig {
        TallyConfig {
            application: ApplicationConfig::default(),
            database: DatabaseConfig {
                connection_string: "host=localhost user=gateway dbname=gateway".to_string(),
                max_connections: default_max_connections(),
                connection_timeout_seconds: default_connection_timeout(),
                statement_timeout_seconds: default_statement_timeout(),
            },
            sink: SinkConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_minimal_config_validates() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_default_sink_config_validates() {
        let sink = SinkConfig::default();
        assert_eq!(sink.timezone, "UTC");
        assert!(sink.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = minimal_config();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_connection_string_rejected() {
        let mut config = minimal_config();
        config.database.connection_string = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_sink_endpoint_rejected() {
        let mut config = minimal_config();
        config.sink.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = minimal_config();
        config.export.interval_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_retry_attempts_rejected() {
        let mut config = minimal_config();
        config.export.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_export_defaults() {
        let export = ExportConfig::default();
        assert_eq!(export.interval_minutes, 60);
        assert_eq!(export.retry.max_attempts, 3);
        assert_eq!(export.retry.base_delay_ms, 1_000);
        assert!(export.lock_enabled);
    }
}
