//! Configuration structures for the refuel tools.
//!
//! - [`WatchConfig`] - file watcher timing and channel sizing
//! - [`ReportConfig`] - defaults for rendering monthly reports
//! - [`Config`] - root configuration combining both
//!
//! Every struct is `#[serde(default)]`, so a configuration file only needs the
//! keys it overrides.

use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::FuelFilter;

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use rf_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.poll_interval_ms, 25);
/// assert_eq!(config.poll_interval().as_millis(), 25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// How long the watch loop blocks waiting for an event before checking
    /// for a stop request. Also the settle window for coalescing events.
    pub poll_interval_ms: u64,

    /// Upper bound on waiting for a stopped watcher task to finish.
    pub shutdown_timeout_ms: u64,

    /// Capacity of the channel carrying change notifications.
    pub channel_capacity: usize,
}

impl WatchConfig {
    /// [`Self::poll_interval_ms`] as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// [`Self::shutdown_timeout_ms`] as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 25,
            shutdown_timeout_ms: 500,
            channel_capacity: 16,
        }
    }
}

/// Defaults for rendering monthly reports.
///
/// # Examples
///
/// ```
/// use rf_core::{FuelFilter, ReportConfig};
///
/// let config = ReportConfig::default();
/// assert_eq!(config.default_filter, FuelFilter::All);
/// assert_eq!(config.label_precision, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Filter applied when none is given on the command line.
    pub default_filter: FuelFilter,

    /// Decimal places of value labels (rounded toward positive infinity).
    pub label_precision: usize,

    /// Fraction of the maximum added above it for the axis upper bound.
    pub headroom_ratio: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_filter: FuelFilter::All,
            label_precision: 3,
            headroom_ratio: 0.1,
        }
    }
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use rf_core::Config;
///
/// let config = Config::from_json_str(r#"{"watch": {"poll_interval_ms": 50}}"#).unwrap();
/// assert_eq!(config.watch.poll_interval_ms, 50);
/// assert_eq!(config.watch.channel_capacity, 16);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File watcher configuration.
    pub watch: WatchConfig,

    /// Report rendering configuration.
    pub report: ReportConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::InvalidOption`] if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`Config::from_json_str`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path, "loaded configuration");
        Ok(config)
    }

    /// Checks option ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first bad option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.poll_interval_ms == 0 {
            return Err(invalid("watch.poll_interval_ms", "must be greater than zero"));
        }
        if self.watch.channel_capacity == 0 {
            return Err(invalid("watch.channel_capacity", "must be greater than zero"));
        }
        if !self.report.headroom_ratio.is_finite() || self.report.headroom_ratio < 0.0 {
            return Err(invalid(
                "report.headroom_ratio",
                "must be a finite, non-negative number",
            ));
        }
        Ok(())
    }
}

fn invalid(option: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidOption {
        option: option.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(25));
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(500));
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn test_report_config_defaults() {
        let config = ReportConfig::default();
        assert!(config.default_filter.is_all());
        assert_eq!(config.label_precision, 3);
        assert!((config.headroom_ratio - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::from_json_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let config = Config::from_json_str(r#"{"report": {"default_filter": "E85"}}"#).unwrap();
        assert_eq!(config.report.default_filter, FuelFilter::category("E85"));
        assert_eq!(config.report.label_precision, 3);
        assert_eq!(config.watch, WatchConfig::default());
    }

    #[test]
    fn test_config_rejects_zero_poll_interval() {
        let err = Config::from_json_str(r#"{"watch": {"poll_interval_ms": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { ref option, .. } if option == "watch.poll_interval_ms"));
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        let err = Config::from_json_str(r#"{"watch": {"channel_capacity": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("channel_capacity"));
    }

    #[test]
    fn test_config_rejects_negative_headroom() {
        let err = Config::from_json_str(r#"{"report": {"headroom_ratio": -0.5}}"#).unwrap_err();
        assert!(err.to_string().contains("headroom_ratio"));
    }

    #[test]
    fn test_config_malformed_json() {
        let err = Config::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp.path().join("refuel.json")).unwrap();
        std::fs::write(&path, r#"{"watch": {"shutdown_timeout_ms": 1000}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.watch.shutdown_timeout_ms, 1000);

        let missing = Config::load(&path.with_file_name("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
