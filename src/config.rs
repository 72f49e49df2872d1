use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, TrajectoryError};
use crate::schema::defaults;

/// Host-supplied settings for one dashboard session.
///
/// Every field has a default, so an empty TOML document is valid:
///
/// ```toml
/// source_url = "https://example.org/confirmed.csv"
/// min_cases = 100
///
/// [retry]
/// max_attempts = 5
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub source_url: String,
    pub min_cases: i64,
    /// Location shown by the single-series calendar plot.
    pub default_location: String,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: defaults::CONFIRMED_URL.to_string(),
            min_cases: defaults::MIN_CASES,
            default_location: defaults::LOCATION.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            min_delay_ms: 500,
            max_delay_ms: 8_000,
            request_timeout_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TrajectoryError::Config(format!("cannot read configuration file: {e}"))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_url.trim().is_empty() {
            return Err(TrajectoryError::Config("source_url must not be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(TrajectoryError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err(TrajectoryError::Config(format!(
                "retry.min_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.min_delay_ms, self.retry.max_delay_ms
            )));
        }
        Ok(())
    }
}
