//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{MvmpError, Result};
use crate::session::PollTiming;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub sink: SinkConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Polling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_response_delay_ms")]
    pub response_delay_ms: u64,

    #[serde(default = "default_day_interval_ms")]
    pub day_interval_ms: u64,

    #[serde(default = "default_night_interval_ms")]
    pub night_interval_ms: u64,

    #[serde(default = "default_night_start_hour")]
    pub night_start_hour: u32,

    #[serde(default = "default_night_end_hour")]
    pub night_end_hour: u32,
}

/// Controller clock configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ClockConfig {
    #[serde(default = "default_sync_on_start")]
    pub sync_on_start: bool,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Telemetry sink configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    #[serde(default = "default_sink_enabled")]
    pub enabled: bool,

    #[serde(default = "default_sensor_prefix")]
    pub sensor_prefix: String,

    /// Base URL of the state API; updates are only logged when unset
    #[serde(default)]
    pub url: Option<String>,

    /// Bearer token sent with each update
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 2400 }
fn default_timeout_ms() -> u64 { 1000 }

fn default_retry_interval_ms() -> u64 { 100 }
fn default_max_retries() -> u32 { 10 }
fn default_response_delay_ms() -> u64 { 100 }
fn default_day_interval_ms() -> u64 { 1000 }
fn default_night_interval_ms() -> u64 { 30_000 }
fn default_night_start_hour() -> u32 { 20 }
fn default_night_end_hour() -> u32 { 6 }

fn default_sync_on_start() -> bool { true }
fn default_settle_ms() -> u64 { 2000 }

fn default_sink_enabled() -> bool { true }
fn default_sensor_prefix() -> String { "mppt_".to_string() }
fn default_sink_timeout_ms() -> u64 { 5000 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval_ms(),
            max_retries: default_max_retries(),
            response_delay_ms: default_response_delay_ms(),
            day_interval_ms: default_day_interval_ms(),
            night_interval_ms: default_night_interval_ms(),
            night_start_hour: default_night_start_hour(),
            night_end_hour: default_night_end_hour(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            sync_on_start: default_sync_on_start(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: default_sink_enabled(),
            sensor_prefix: default_sensor_prefix(),
            url: None,
            token: None,
            timeout_ms: default_sink_timeout_ms(),
        }
    }
}

impl PollConfig {
    /// Timing for a single poll session
    pub fn timing(&self) -> PollTiming {
        PollTiming {
            response_delay: Duration::from_millis(self.response_delay_ms),
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            max_retries: self.max_retries,
        }
    }

    /// Whether `hour` falls in the night window, which may wrap midnight
    pub fn is_night(&self, hour: u32) -> bool {
        let (start, end) = (self.night_start_hour, self.night_end_hour);
        if start == end {
            false
        } else if start < end {
            hour >= start && hour < end
        } else {
            hour >= start || hour < end
        }
    }

    /// Pause between polls for the given local hour
    pub fn interval_for_hour(&self, hour: u32) -> Duration {
        if self.is_night(hour) {
            Duration::from_millis(self.night_interval_ms)
        } else {
            Duration::from_millis(self.day_interval_ms)
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mvmp_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate serial port configuration
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        // Validate poll timing
        if self.poll.retry_interval_ms == 0 || self.poll.retry_interval_ms > 10000 {
            return Err(invalid("retry_interval_ms must be between 1 and 10000"));
        }

        if self.poll.max_retries == 0 || self.poll.max_retries > 1000 {
            return Err(invalid("max_retries must be between 1 and 1000"));
        }

        if self.poll.response_delay_ms > 10000 {
            return Err(invalid("response_delay_ms must be between 0 and 10000"));
        }

        for (name, value) in [
            ("day_interval_ms", self.poll.day_interval_ms),
            ("night_interval_ms", self.poll.night_interval_ms),
        ] {
            if value == 0 || value > 3_600_000 {
                return Err(invalid(format!("{} must be between 1 and 3600000", name)));
            }
        }

        for (name, value) in [
            ("night_start_hour", self.poll.night_start_hour),
            ("night_end_hour", self.poll.night_end_hour),
        ] {
            if value > 23 {
                return Err(invalid(format!("{} must be between 0 and 23", name)));
            }
        }

        // Validate clock sync
        if self.clock.settle_ms > 60000 {
            return Err(invalid("settle_ms must be between 0 and 60000"));
        }

        // Validate sink
        if self.sink.enabled && self.sink.sensor_prefix.is_empty() {
            return Err(invalid("sensor_prefix cannot be empty when sink is enabled"));
        }

        if let Some(url) = &self.sink.url {
            match reqwest::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                Ok(_) => return Err(invalid("sink url must use http or https")),
                Err(e) => return Err(invalid(format!("invalid sink url {}: {}", url, e))),
            }
        }

        if self.sink.timeout_ms == 0 || self.sink.timeout_ms > 60000 {
            return Err(invalid("sink timeout_ms must be between 1 and 60000"));
        }

        Ok(())
    }
}

fn invalid(message: impl std::fmt::Display) -> MvmpError {
    MvmpError::Config(toml::de::Error::custom(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 2400);
        assert_eq!(config.poll.max_retries, 10);
        assert!(config.clock.sync_on_start);
        assert_eq!(config.sink.sensor_prefix, "mppt_");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.serial.port, default_serial_port());
        assert_eq!(config.poll.night_interval_ms, 30_000);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyS1"
baud_rate = 9600

[poll]
max_retries = 20

[clock]
sync_on_start = false

[sink]
sensor_prefix = "solar_"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyS1");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.timeout_ms, default_timeout_ms());
        assert_eq!(config.poll.max_retries, 20);
        assert!(!config.clock.sync_on_start);
        assert_eq!(config.sink.sensor_prefix, "solar_");
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.serial.port, default_serial_port());
        assert_eq!(config.poll.timing(), PollConfig::default().timing());
        assert_eq!(config.poll.night_start_hour, default_night_start_hour());
        assert_eq!(config.clock.settle_ms, default_settle_ms());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/mvmp-bridge.toml");
        assert!(matches!(result, Err(MvmpError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml("[serial\nport = ");
        assert!(matches!(result, Err(MvmpError::Config(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 420_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = Config::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_interval_zero() {
        let mut config = Config::default();
        config.poll.retry_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_retries_bounds() {
        let mut config = Config::default();
        config.poll.max_retries = 0;
        assert!(config.validate().is_err());
        config.poll.max_retries = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_response_delay_zero_is_allowed() {
        let mut config = Config::default();
        config.poll.response_delay_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_intervals_bounds() {
        let mut config = Config::default();
        config.poll.day_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poll.night_interval_ms = 3_600_001;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("night_interval_ms"));
    }

    #[test]
    fn test_night_hour_out_of_range() {
        let mut config = Config::default();
        config.poll.night_start_hour = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settle_too_long() {
        let mut config = Config::default();
        config.clock.settle_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_prefix_when_enabled() {
        let mut config = Config::default();
        config.sink.sensor_prefix = String::new();
        assert!(config.validate().is_err());

        config.sink.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sink_url_and_token() {
        let toml_str = r#"
[sink]
url = "http://hass.local:8123"
token = "secret"
timeout_ms = 2500
"#;
        let config = Config::from_toml(toml_str).unwrap();
        assert_eq!(config.sink.url.as_deref(), Some("http://hass.local:8123"));
        assert_eq!(config.sink.token.as_deref(), Some("secret"));
        assert_eq!(config.sink.timeout_ms, 2500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_sink_url() {
        let mut config = Config::default();
        config.sink.url = Some("hass.local:8123/api".to_string());
        assert!(config.validate().is_err());

        config.sink.url = Some("ftp://hass.local".to_string());
        assert!(config.validate().is_err());

        config.sink.url = Some("https://hass.local".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sink_timeout_bounds() {
        let mut config = Config::default();
        config.sink.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.sink.timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_timing() {
        let timing = PollConfig::default().timing();
        assert_eq!(timing, PollTiming::default());
        assert_eq!(timing.max_wait(), Duration::from_millis(1200));
    }

    #[test]
    fn test_night_window_wraps_midnight() {
        let poll = PollConfig::default();

        for hour in [20, 21, 23, 0, 3, 5] {
            assert!(poll.is_night(hour), "hour {} should be night", hour);
            assert_eq!(poll.interval_for_hour(hour), Duration::from_secs(30));
        }
        for hour in [6, 7, 12, 19] {
            assert!(!poll.is_night(hour), "hour {} should be day", hour);
            assert_eq!(poll.interval_for_hour(hour), Duration::from_secs(1));
        }
    }

    #[test]
    fn test_night_window_same_day() {
        let poll = PollConfig {
            night_start_hour: 1,
            night_end_hour: 4,
            ..PollConfig::default()
        };
        assert!(!poll.is_night(0));
        assert!(poll.is_night(1));
        assert!(poll.is_night(3));
        assert!(!poll.is_night(4));
    }

    #[test]
    fn test_night_window_disabled() {
        let poll = PollConfig {
            night_start_hour: 5,
            night_end_hour: 5,
            ..PollConfig::default()
        };
        assert!((0..24).all(|hour| !poll.is_night(hour)));
    }
}
