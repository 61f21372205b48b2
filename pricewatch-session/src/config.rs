//! Session configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration.

use pricewatch_core::classifier::ClassifierConfig;
use pricewatch_core::features::FeatureConfig;
use pricewatch_core::feed::FeedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Alert monitoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Seconds between evaluation cycles.
    pub poll_interval_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
        }
    }
}

impl AlertConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level; `RUST_LOG` directives are applied on top.
    pub level: String,
    /// One JSON object per line instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

/// Everything a session needs apart from the feed and sink it is handed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub feed: FeedConfig,
    pub features: FeatureConfig,
    pub classifier: ClassifierConfig,
    pub alerts: AlertConfig,
    pub logging: LoggingConfig,
}

impl WatchConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: WatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        let f = &self.features;
        if !(f.threshold.is_finite() && f.threshold >= 0.0) {
            return invalid(format!("features.threshold must be >= 0, got {}", f.threshold));
        }
        if f.short_window == 0 || f.short_window > f.long_window {
            return invalid(format!(
                "features windows must satisfy 1 <= short_window <= long_window, got {} and {}",
                f.short_window, f.long_window
            ));
        }

        let c = &self.classifier;
        if !(c.test_ratio > 0.0 && c.test_ratio < 1.0) {
            return invalid(format!(
                "classifier.test_ratio must be in (0, 1), got {}",
                c.test_ratio
            ));
        }
        if c.n_trees == 0 {
            return invalid("classifier.n_trees must be at least 1".into());
        }
        if c.max_features == Some(0) {
            return invalid("classifier.max_features must be at least 1 when set".into());
        }

        if self.alerts.poll_interval_secs == 0 {
            return invalid("alerts.poll_interval_secs must be > 0".into());
        }
        if self.feed.timeout_secs == 0 {
            return invalid("feed.timeout_secs must be > 0".into());
        }
        Ok(())
    }
}
