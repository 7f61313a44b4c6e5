//! Pure projection of store state into presentation payloads.
//!
//! Everything here is a pure function over the stores: no network, no
//! timers, no mutation. The poll loop calls these after every state
//! change and publishes the resulting [`Projections`] snapshot; a
//! presentation adapter (terminal, web, whatever) only ever consumes
//! those snapshots.

use std::time::Duration;

use crate::data::{
    Alert, AlertLedger, Metric, ProbeRegistry, Range, Reading, SeriesCache,
    SeriesKey, SnapshotStore,
};

/// Age thresholds for deriving a probe's presence from its last reading.
#[derive(Debug, Clone)]
pub struct StatusThresholds {
    /// Age after which a probe is considered late.
    pub late_after: Duration,
    /// Age after which a probe is considered offline.
    pub offline_after: Duration,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            late_after: Duration::from_secs(120),
            offline_after: Duration::from_secs(600),
        }
    }
}

/// Derived presence of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Online,
    Late,
    Offline,
    /// No reading has ever been seen for this probe.
    NoData,
}

impl Presence {
    /// Short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Presence::Online => "OK",
            Presence::Late => "LATE",
            Presence::Offline => "OFFLINE",
            Presence::NoData => "--",
        }
    }

    fn derive(last_seen: Option<i64>, now: i64, thresholds: &StatusThresholds) -> Self {
        let Some(ts) = last_seen else {
            return Presence::NoData;
        };
        let age = now.saturating_sub(ts).max(0) as u64;
        if age >= thresholds.offline_after.as_secs() {
            Presence::Offline
        } else if age >= thresholds.late_after.as_secs() {
            Presence::Late
        } else {
            Presence::Online
        }
    }
}

/// One row of the status list.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRow {
    pub probe_id: String,
    /// Timestamp of the last reading, or `None` for "no data".
    pub last_seen: Option<i64>,
    pub presence: Presence,
}

/// One probe card of the carousel, carrying the full metric set.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeCard {
    pub probe_id: String,
    pub mode: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub light: Option<f64>,
    pub air_quality: Option<f64>,
    pub last_seen: Option<i64>,
    pub presence: Presence,
}

impl ProbeCard {
    fn from_reading(probe_id: &str, reading: Option<&Reading>, presence: Presence) -> Self {
        Self {
            probe_id: probe_id.to_string(),
            mode: reading.and_then(|r| r.mode.clone()),
            temperature: reading.and_then(|r| r.temperature),
            humidity: reading.and_then(|r| r.humidity),
            soil_moisture: reading.and_then(|r| r.soil_moisture),
            light: reading.and_then(|r| r.light),
            air_quality: reading.and_then(|r| r.air_quality),
            last_seen: reading.map(|r| r.ts),
            presence,
        }
    }
}

/// One chart-ready (label, value) point.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// One metric's chart payload for the selected probe and range.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub metric: Metric,
    pub title: String,
    pub points: Vec<ChartPoint>,
    /// The latest fetch for this key failed; points may be stale.
    pub fetch_failed: bool,
}

/// Immutable snapshot of every presentation projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projections {
    /// Status list: one row per visible probe.
    pub status: Vec<StatusRow>,
    /// Card carousel: same probes, full metric set.
    pub cards: Vec<ProbeCard>,
    /// Flat table: same rows as the cards.
    pub table: Vec<ProbeCard>,
    /// Chart payloads for the selected probe, one per charted metric.
    pub charts: Vec<ChartSeries>,
    /// Probe feeding the charts, if any is selected/visible.
    pub chart_probe: Option<String>,
    /// Active dashboard-wide range.
    pub range: Range,
    /// Active alerts, most severe first.
    pub active_alerts: Vec<Alert>,
    /// Recovered and acknowledged alerts, most recent first.
    pub alert_history: Vec<Alert>,
    /// Set when the last poll tick failed; cleared on the next success.
    pub degraded: bool,
}

/// Build the status list projection.
pub fn status_rows(
    snapshots: &SnapshotStore,
    registry: &ProbeRegistry,
    now: i64,
    thresholds: &StatusThresholds,
) -> Vec<StatusRow> {
    registry
        .visible_ids()
        .into_iter()
        .map(|probe_id| {
            let last_seen = snapshots.latest_for(&probe_id).map(|r| r.ts);
            StatusRow {
                presence: Presence::derive(last_seen, now, thresholds),
                probe_id,
                last_seen,
            }
        })
        .collect()
}

/// Build the card projection (also used as the flat table rows).
pub fn probe_cards(
    snapshots: &SnapshotStore,
    registry: &ProbeRegistry,
    now: i64,
    thresholds: &StatusThresholds,
) -> Vec<ProbeCard> {
    registry
        .visible_ids()
        .into_iter()
        .map(|probe_id| {
            let reading = snapshots.latest_for(&probe_id);
            let presence = Presence::derive(reading.map(|r| r.ts), now, thresholds);
            ProbeCard::from_reading(&probe_id, reading, presence)
        })
        .collect()
}

/// Build chart payloads for one probe over the active range.
///
/// Labels follow the range's granularity; a key whose latest fetch
/// failed keeps its stale points and carries the failure flag.
pub fn chart_series(series: &SeriesCache, probe_id: &str, range: Range) -> Vec<ChartSeries> {
    Metric::CHARTED
        .iter()
        .map(|&metric| {
            let key = SeriesKey::new(probe_id, metric, range);
            let state = series.current(&key);
            ChartSeries {
                metric,
                title: metric.title().to_string(),
                points: state
                    .points
                    .iter()
                    .map(|p| ChartPoint {
                        label: range.format_label(p.ts),
                        value: p.value,
                    })
                    .collect(),
                fetch_failed: state.fetch_failed,
            }
        })
        .collect()
}

/// Derive the full projection set from the stores.
#[allow(clippy::too_many_arguments)]
pub fn project(
    snapshots: &SnapshotStore,
    registry: &ProbeRegistry,
    series: &SeriesCache,
    alerts: &AlertLedger,
    chart_probe: Option<&str>,
    range: Range,
    now: i64,
    thresholds: &StatusThresholds,
    degraded: bool,
) -> Projections {
    let cards = probe_cards(snapshots, registry, now, thresholds);
    Projections {
        status: status_rows(snapshots, registry, now, thresholds),
        table: cards.clone(),
        cards,
        charts: chart_probe
            .map(|probe| chart_series(series, probe, range))
            .unwrap_or_default(),
        chart_probe: chart_probe.map(str::to_string),
        range,
        active_alerts: alerts.active_view().into_iter().cloned().collect(),
        alert_history: alerts.history_view().into_iter().cloned().collect(),
        degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ProbeFilter, SeriesPoint};

    fn reading(probe: &str, ts: i64, temp: f64) -> Reading {
        Reading {
            probe_id: probe.to_string(),
            ts,
            mode: Some("eco".to_string()),
            temperature: Some(temp),
            humidity: None,
            soil_moisture: Some(33.0),
            light: None,
            air_quality: None,
        }
    }

    #[test]
    fn test_status_rows_include_probes_without_data() {
        let mut snapshots = SnapshotStore::new();
        let mut registry = ProbeRegistry::new();
        registry.absorb(["sonde1", "sonde2"]);
        snapshots.merge([reading("sonde1", 1000, 22.0)]);

        let rows = status_rows(&snapshots, &registry, 1010, &StatusThresholds::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].probe_id, "sonde1");
        assert_eq!(rows[0].presence, Presence::Online);
        assert_eq!(rows[1].probe_id, "sonde2");
        assert_eq!(rows[1].last_seen, None);
        assert_eq!(rows[1].presence, Presence::NoData);
    }

    #[test]
    fn test_presence_thresholds() {
        let thresholds = StatusThresholds::default();
        assert_eq!(Presence::derive(Some(1000), 1060, &thresholds), Presence::Online);
        assert_eq!(Presence::derive(Some(1000), 1130, &thresholds), Presence::Late);
        assert_eq!(Presence::derive(Some(1000), 1700, &thresholds), Presence::Offline);
        assert_eq!(Presence::derive(None, 1700, &thresholds), Presence::NoData);
    }

    #[test]
    fn test_clearing_filter_restores_all_probes() {
        let mut registry = ProbeRegistry::new();
        registry.absorb(["sonde1", "sonde2", "sonde3"]);
        let snapshots = SnapshotStore::new();

        registry.set_filter(ProbeFilter::select(["sonde1"]));
        let rows = status_rows(&snapshots, &registry, 0, &StatusThresholds::default());
        assert_eq!(rows.len(), 1);

        // Deselecting everything is the all-sentinel, never "no probes".
        registry.set_filter(ProbeFilter::select(Vec::<String>::new()));
        let rows = status_rows(&snapshots, &registry, 0, &StatusThresholds::default());
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_rows_sorted_naturally() {
        let mut registry = ProbeRegistry::new();
        registry.absorb(["probe10", "probe2"]);
        let snapshots = SnapshotStore::new();

        let rows = status_rows(&snapshots, &registry, 0, &StatusThresholds::default());
        let ids: Vec<&str> = rows.iter().map(|r| r.probe_id.as_str()).collect();
        assert_eq!(ids, vec!["probe2", "probe10"]);
    }

    #[test]
    fn test_cards_carry_metrics_and_placeholders() {
        let mut snapshots = SnapshotStore::new();
        let mut registry = ProbeRegistry::new();
        registry.absorb(["sonde1"]);
        snapshots.merge([reading("sonde1", 50, 24.5)]);

        let cards = probe_cards(&snapshots, &registry, 60, &StatusThresholds::default());
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].temperature, Some(24.5));
        assert_eq!(cards[0].soil_moisture, Some(33.0));
        assert_eq!(cards[0].humidity, None);
        assert_eq!(cards[0].mode.as_deref(), Some("eco"));
    }

    #[test]
    fn test_chart_series_shapes_points() {
        let mut cache = SeriesCache::new();
        let key = SeriesKey::new("sonde1", Metric::SoilMoisture, Range::Hour24);
        let seq = cache.begin_fetch(&key);
        cache.apply(
            &key,
            seq,
            vec![
                SeriesPoint { ts: 1700000000, value: 31.0 },
                SeriesPoint { ts: 1700000600, value: 30.0 },
            ],
        );

        let charts = chart_series(&cache, "sonde1", Range::Hour24);
        assert_eq!(charts.len(), Metric::CHARTED.len());

        let soil = charts.iter().find(|c| c.metric == Metric::SoilMoisture).unwrap();
        assert_eq!(soil.points.len(), 2);
        assert_eq!(soil.points[0].label, "22:13");
        assert_eq!(soil.points[0].value, 31.0);

        // Metrics never fetched project as empty, not as errors.
        let temp = charts.iter().find(|c| c.metric == Metric::Temperature).unwrap();
        assert!(temp.points.is_empty());
        assert!(!temp.fetch_failed);
    }

    #[test]
    fn test_project_composes_everything() {
        let mut snapshots = SnapshotStore::new();
        let mut registry = ProbeRegistry::new();
        registry.absorb(["sonde1"]);
        snapshots.merge([reading("sonde1", 100, 20.0)]);
        let series = SeriesCache::new();
        let alerts = AlertLedger::new();

        let projections = project(
            &snapshots,
            &registry,
            &series,
            &alerts,
            Some("sonde1"),
            Range::Hour1,
            110,
            &StatusThresholds::default(),
            true,
        );

        assert_eq!(projections.status.len(), 1);
        assert_eq!(projections.cards, projections.table);
        assert_eq!(projections.chart_probe.as_deref(), Some("sonde1"));
        assert_eq!(projections.charts.len(), 4);
        assert!(projections.degraded);
    }
}
