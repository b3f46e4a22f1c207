//! Configuration module for scrapper.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{Result, ScrapperError};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/scrapper.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/scrapper.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the periodic scrape job runs.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,
    /// Seconds between two scrape ticks.
    #[serde(default = "default_scheduler_interval")]
    pub interval_secs: u64,
    /// Maximum number of feeds ingested at the same time within one tick.
    #[serde(default = "default_max_concurrent_feeds")]
    pub max_concurrent_feeds: usize,
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_scheduler_interval() -> u64 {
    3600 // 1 hour
}

fn default_max_concurrent_feeds() -> usize {
    4
}

impl SchedulerConfig {
    /// Tick interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            interval_secs: default_scheduler_interval(),
            max_concurrent_feeds: default_max_concurrent_feeds(),
        }
    }
}

/// Feed fetching configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Maximum entries taken from one document.
    #[serde(default = "default_max_items")]
    pub max_items_per_feed: usize,
    /// Maximum description length in characters.
    #[serde(default = "default_max_description_length")]
    pub max_description_length: usize,
    /// Allow loopback and private network hosts (local development and tests).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_items() -> usize {
    200
}

fn default_max_description_length() -> usize {
    10000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            max_items_per_feed: default_max_items(),
            max_description_length: default_max_description_length(),
            allow_private_hosts: false,
        }
    }
}

/// Store access configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Upper bound for a single registry or store call, in seconds.
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

fn default_store_timeout() -> u64 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_store_timeout(),
        }
    }
}

/// Subscriber notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Whether digests are sent at all.
    #[serde(default = "default_notify_enabled")]
    pub enabled: bool,
    /// Display name used in the From header.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    /// Address used in the From header.
    #[serde(default)]
    pub sender_address: String,
    /// Upper bound for a single send, in seconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    /// Timezone used for dates shown in digests.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_notify_enabled() -> bool {
    true
}

fn default_sender_name() -> String {
    "Scrapper Team".to_string()
}

fn default_send_timeout() -> u64 {
    10
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: default_notify_enabled(),
            sender_name: default_sender_name(),
            sender_address: String::new(),
            send_timeout_secs: default_send_timeout(),
            timezone: default_timezone(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Whether the on-demand trigger API is served.
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the API.
    #[serde(default = "default_web_port")]
    pub port: u16,
}

fn default_web_enabled() -> bool {
    true
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8080
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Feed fetching configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Store access configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Notification configuration.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ScrapperError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ScrapperError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SCRAPPER_DATABASE_PATH`: database file path
    /// - `SCRAPPER_SENDER_ADDRESS`: digest sender address
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SCRAPPER_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(address) = std::env::var("SCRAPPER_SENDER_ADDRESS") {
            if !address.is_empty() {
                self.notify.sender_address = address;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.interval_secs == 0 {
            return Err(ScrapperError::Config(
                "scheduler.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.scheduler.max_concurrent_feeds == 0 {
            return Err(ScrapperError::Config(
                "scheduler.max_concurrent_feeds must be greater than zero".to_string(),
            ));
        }
        if self.fetch.total_timeout_secs == 0 || self.store.timeout_secs == 0 {
            return Err(ScrapperError::Config(
                "fetch and store timeouts must be greater than zero".to_string(),
            ));
        }
        if self.notify.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ScrapperError::Config(format!(
                "unknown timezone: {}",
                self.notify.timezone
            )));
        }
        if self.notify.enabled && self.notify.sender_address.is_empty() {
            return Err(ScrapperError::Config(
                "notify is enabled but sender_address is not set. \
                 Set it in config.toml or via SCRAPPER_SENDER_ADDRESS."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.notify.sender_address = "digest@example.com".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.database.path, "data/scrapper.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/scrapper.log");
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_secs, 3600);
        assert_eq!(config.scheduler.max_concurrent_feeds, 4);
        assert_eq!(config.fetch.total_timeout_secs, 30);
        assert_eq!(config.fetch.max_feed_size_bytes, 5 * 1024 * 1024);
        assert!(!config.fetch.allow_private_hosts);
        assert_eq!(config.store.timeout_secs, 5);
        assert_eq!(config.notify.sender_name, "Scrapper Team");
        assert_eq!(config.notify.timezone, "UTC");
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[scheduler]
interval_secs = 600

[notify]
sender_address = "news@example.com"
timezone = "Europe/London"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.scheduler.interval_secs, 600);
        assert_eq!(config.scheduler.max_concurrent_feeds, 4);
        assert_eq!(config.notify.sender_address, "news@example.com");
        assert_eq!(config.notify.timezone, "Europe/London");
        assert_eq!(config.database.path, "data/scrapper.db");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.scheduler.interval_secs, 3600);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[scheduler\ninterval_secs = ");
        assert!(matches!(result, Err(ScrapperError::Config(_))));
    }

    #[test]
    fn test_scheduler_interval() {
        let config = SchedulerConfig {
            interval_secs: 90,
            ..Default::default()
        };
        assert_eq!(config.interval(), Duration::from_secs(90));
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = valid_config();
        config.scheduler.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = valid_config();
        config.scheduler.max_concurrent_feeds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_timezone() {
        let mut config = valid_config();
        config.notify.timezone = "Mars/Olympus".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown timezone"));
    }

    #[test]
    fn test_validate_missing_sender() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sender_address"));

        let mut disabled = Config::default();
        disabled.notify.enabled = false;
        assert!(disabled.validate().is_ok());
    }
}
