//! Runtime configuration.
//!
//! Settings come from an optional config file overlaid with
//! `PROBEWATCH_`-prefixed environment variables; anything not given
//! falls back to the defaults observed in production deployments
//! (5 s polling, 200-row pulls).

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::view::StatusThresholds;

/// Dashboard engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the telemetry backend API.
    pub base_url: String,
    /// Seconds between latest-readings pulls.
    pub snapshot_interval_secs: u64,
    /// Seconds between active-alert pulls.
    pub alert_interval_secs: u64,
    /// Seconds between series refreshes for the selected probe.
    pub series_interval_secs: u64,
    /// Row cap for latest-readings pulls.
    pub latest_limit: usize,
    /// Row cap for the startup alert-history pull.
    pub history_limit: usize,
    /// Reading age (seconds) after which a probe shows as late.
    pub late_after_secs: u64,
    /// Reading age (seconds) after which a probe shows as offline.
    pub offline_after_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            snapshot_interval_secs: 5,
            alert_interval_secs: 5,
            series_interval_secs: 5,
            latest_limit: 200,
            history_limit: 200,
            late_after_secs: 120,
            offline_after_secs: 600,
        }
    }
}

impl DashboardConfig {
    /// Load settings from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix("PROBEWATCH"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_interval_secs)
    }

    pub fn series_interval(&self) -> Duration {
        Duration::from_secs(self.series_interval_secs)
    }

    pub fn thresholds(&self) -> StatusThresholds {
        StatusThresholds {
            late_after: Duration::from_secs(self.late_after_secs),
            offline_after: Duration::from_secs(self.offline_after_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.snapshot_interval(), Duration::from_secs(5));
        assert_eq!(config.latest_limit, 200);
        assert_eq!(config.thresholds().offline_after, Duration::from_secs(600));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "base_url = \"http://sensors.local/api\"\nsnapshot_interval_secs = 2"
        )
        .unwrap();

        let config = DashboardConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.base_url, "http://sensors.local/api");
        assert_eq!(config.snapshot_interval(), Duration::from_secs(2));
        // Untouched keys keep their defaults.
        assert_eq!(config.alert_interval(), Duration::from_secs(5));
    }
}
