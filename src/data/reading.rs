//! Wire types shared with the telemetry backend.
//!
//! These types match the JSON shapes served by the backend's HTTP API.
//! They are the common format between the collector side and this
//! dashboard consumer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One timestamped multi-metric measurement from a probe.
///
/// Every metric field is optional: a probe may be offline or an
/// individual sensor may have failed. Missing values render as
/// placeholders, never as errors.
///
/// The backend serves the collector's short column names (`sonde_id`,
/// `temp`, `hum_air`, `soil_pct`, `lum_raw`, `mq_raw`); serde aliases
/// accept those alongside the descriptive names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Stable probe identifier.
    #[serde(alias = "sonde_id")]
    pub probe_id: String,

    /// Measurement time in epoch seconds.
    pub ts: i64,

    /// Free-form operating mode label reported by the probe firmware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Air temperature in degrees Celsius.
    #[serde(alias = "temp", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Relative air humidity in percent.
    #[serde(alias = "hum_air", skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Soil moisture in percent.
    #[serde(alias = "soil_pct", skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,

    /// Raw ambient light level.
    #[serde(alias = "lum_raw", skip_serializing_if = "Option::is_none")]
    pub light: Option<f64>,

    /// Raw air-quality sensor level.
    #[serde(alias = "mq_raw", skip_serializing_if = "Option::is_none")]
    pub air_quality: Option<f64>,
}

/// One (timestamp, value) pair of a metric time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Measurement time in epoch seconds.
    pub ts: i64,
    /// Metric value at that time.
    #[serde(rename = "v")]
    pub value: f64,
}

/// The metrics a probe reports and the backend can serve series for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Temperature,
    AirHumidity,
    SoilMoisture,
    Light,
    AirQuality,
}

impl Metric {
    /// All metrics, in display order.
    pub const ALL: [Metric; 5] = [
        Metric::Temperature,
        Metric::AirHumidity,
        Metric::SoilMoisture,
        Metric::Light,
        Metric::AirQuality,
    ];

    /// The four metrics shown as charts on the dashboard.
    pub const CHARTED: [Metric; 4] = [
        Metric::SoilMoisture,
        Metric::Temperature,
        Metric::AirQuality,
        Metric::Light,
    ];

    /// The identifier used in backend series queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::AirHumidity => "air-humidity",
            Metric::SoilMoisture => "soil-moisture",
            Metric::Light => "light",
            Metric::AirQuality => "air-quality",
        }
    }

    /// Human title used for chart headers.
    pub fn title(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temp (°C)",
            Metric::AirHumidity => "Air humidity (%)",
            Metric::SoilMoisture => "Soil (%)",
            Metric::Light => "Light (raw)",
            Metric::AirQuality => "Air quality (raw)",
        }
    }

    /// Extract this metric's value from a reading.
    pub fn value_of(&self, reading: &Reading) -> Option<f64> {
        match self {
            Metric::Temperature => reading.temperature,
            Metric::AirHumidity => reading.humidity,
            Metric::SoilMoisture => reading.soil_moisture,
            Metric::Light => reading.light,
            Metric::AirQuality => reading.air_quality,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(Metric::Temperature),
            "air-humidity" => Ok(Metric::AirHumidity),
            "soil-moisture" => Ok(Metric::SoilMoisture),
            "light" => Ok(Metric::Light),
            "air-quality" => Ok(Metric::AirQuality),
            other => Err(format!("unknown metric: {other}")),
        }
    }
}

/// Historical window selector for chart queries.
///
/// Exactly one range is active dashboard-wide at a time. It controls both
/// the requested history depth and the chart label granularity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Range {
    Hour1,
    Hour12,
    #[default]
    Hour24,
    Day7,
    Day30,
}

impl Range {
    /// All ranges, in ascending depth order.
    pub const ALL: [Range; 5] = [
        Range::Hour1,
        Range::Hour12,
        Range::Hour24,
        Range::Day7,
        Range::Day30,
    ];

    /// The identifier used in backend series queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Range::Hour1 => "1h",
            Range::Hour12 => "12h",
            Range::Hour24 => "24h",
            Range::Day7 => "7d",
            Range::Day30 => "30d",
        }
    }

    /// Window depth in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            Range::Hour1 => 3600,
            Range::Hour12 => 12 * 3600,
            Range::Hour24 => 24 * 3600,
            Range::Day7 => 7 * 24 * 3600,
            Range::Day30 => 30 * 24 * 3600,
        }
    }

    /// Format a point timestamp as a chart axis label.
    ///
    /// Intra-day ranges label points by time of day; multi-day ranges
    /// label them by date so the axis stays readable.
    pub fn format_label(&self, ts: i64) -> String {
        let Some(dt) = chrono::DateTime::from_timestamp(ts, 0) else {
            return "--".to_string();
        };
        match self {
            Range::Hour1 | Range::Hour12 | Range::Hour24 => dt.format("%H:%M").to_string(),
            Range::Day7 | Range::Day30 => dt.format("%d/%m %H:%M").to_string(),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Range {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Range::Hour1),
            "12h" => Ok(Range::Hour12),
            "24h" => Ok(Range::Hour24),
            "7d" => Ok(Range::Day7),
            "30d" => Ok(Range::Day30),
            other => Err(format!("unknown range: {other} (expected 1h, 12h, 24h, 7d or 30d)")),
        }
    }
}

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Crit,
}

impl Severity {
    /// Short uppercase symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Crit => "CRIT",
        }
    }
}

/// A currently-true alert condition as reported by the backend.
///
/// Identity is the (probe, code) pair; repeated reports of the same pair
/// describe the same condition, not a new alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionReport {
    #[serde(alias = "sonde_id")]
    pub probe_id: String,
    /// Condition code, e.g. `SOIL_LOW` or `PROBE_OFFLINE`.
    pub code: String,
    #[serde(alias = "level")]
    pub severity: Severity,
    pub message: String,
    /// Detection time in epoch seconds.
    pub ts: i64,
    /// Measured value that triggered the condition, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// A past alert record served by the backend's history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PastAlert {
    #[serde(alias = "sonde_id")]
    pub probe_id: String,
    pub code: String,
    #[serde(alias = "level")]
    pub severity: Severity,
    pub message: String,
    /// Last time the condition was seen, epoch seconds.
    pub ts: i64,
    /// Whether the record was dismissed by a user.
    pub acknowledged: bool,
}
