//! Monitor configuration
//!
//! Layered: built-in defaults, then an optional file (TOML/JSON/YAML by
//! extension), then `DROWSY__`-prefixed environment variables such as
//! `DROWSY__TRACKER__SLEEP_THRESHOLD=6`.

use anyhow::Context;
use dms::{Location, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Drowsiness tracker thresholds
    pub tracker: TrackerConfig,

    /// Where raised SOS records are appended
    pub store_path: PathBuf,

    /// Fixed location attached to raised SOS records
    pub location: Option<Location>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Frames buffered between a reader and its session worker
    pub channel_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            store_path: PathBuf::from("local_data/sos_alerts.jsonl"),
            location: None,
            log_level: "info".to_string(),
            channel_capacity: 256,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("DROWSY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: MonitorConfig = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        config.tracker.validate()?;
        anyhow::ensure!(config.channel_capacity > 0, "channel_capacity must be at least 1");
        Ok(config)
    }
}
