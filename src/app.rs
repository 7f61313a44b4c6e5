//! Dashboard state: the composition root owning every store.
//!
//! One `Dashboard` is created at startup and owned by the poll loop,
//! which is the single writer for all stores. Nothing here touches the
//! network or a timer; the poll loop feeds fetch results in and user
//! commands arrive through the same single-threaded path.

use crate::data::{
    AlertKey, AlertLedger, ConditionReport, Metric, PastAlert, ProbeFilter, ProbeRegistry, Range,
    Reading, SeriesCache, SeriesKey, SeriesPoint, SnapshotStore,
};
use crate::view::{self, Projections, StatusThresholds};

/// A user-driven state change, delivered to the poll loop as a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the visibility filter (empty selection means all).
    SetFilter(ProbeFilter),
    /// Switch the dashboard-wide chart range.
    SetRange(Range),
    /// Select the probe feeding the charts.
    SelectProbe(String),
    /// Acknowledge one alert.
    Acknowledge(AlertKey),
    /// Acknowledge every visible alert, locally and server-side.
    AcknowledgeAll,
    /// Stop the poll loop.
    Shutdown,
}

/// All dashboard state plus the selection driving chart queries.
#[derive(Debug)]
pub struct Dashboard {
    pub snapshots: SnapshotStore,
    pub registry: ProbeRegistry,
    pub series: SeriesCache,
    pub alerts: AlertLedger,
    thresholds: StatusThresholds,
    /// Probe explicitly selected for the charts, if any.
    selected_probe: Option<String>,
    range: Range,
    degraded: bool,
}

impl Dashboard {
    pub fn new(thresholds: StatusThresholds) -> Self {
        Self {
            snapshots: SnapshotStore::new(),
            registry: ProbeRegistry::new(),
            series: SeriesCache::new(),
            alerts: AlertLedger::new(),
            thresholds,
            selected_probe: None,
            range: Range::default(),
            degraded: false,
        }
    }

    /// Record the result of a probe-list pull.
    pub fn apply_probe_list(&mut self, ids: Vec<String>) {
        self.registry.absorb(ids);
        self.degraded = false;
    }

    /// Merge a latest-readings pull into the snapshot store.
    ///
    /// Probes first seen here become known to the registry.
    pub fn apply_latest(&mut self, readings: Vec<Reading>) {
        for reading in &readings {
            self.registry.note(&reading.probe_id);
        }
        self.snapshots.merge(readings);
        self.degraded = false;
    }

    /// Reconcile an active-conditions report into the ledger.
    pub fn apply_alert_report(&mut self, report: Vec<ConditionReport>) {
        self.alerts.apply_report(&report);
        self.degraded = false;
    }

    /// Backfill ledger records from the backend's history endpoint.
    pub fn apply_alert_history(&mut self, past: Vec<PastAlert>) {
        self.alerts.absorb_history(&past);
        self.degraded = false;
    }

    /// Apply a completed series fetch. Stale responses are discarded by
    /// the cache; only an applied response counts as backend contact.
    pub fn apply_series(&mut self, key: &SeriesKey, seq: u64, points: Vec<SeriesPoint>) -> bool {
        let applied = self.series.apply(key, seq, points);
        if applied {
            self.degraded = false;
        }
        applied
    }

    /// Record a failed series fetch. A stale failure (superseded by a
    /// newer fetch for the same key) is not an error at all.
    pub fn fail_series(&mut self, key: &SeriesKey, seq: u64) {
        if self.series.fail(key, seq) {
            self.degraded = true;
        }
    }

    /// Record a failed poll tick. The store the tick would have fed is
    /// left unchanged; the tick is retried on its next schedule.
    pub fn mark_degraded(&mut self) {
        self.degraded = true;
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// The probe whose series feed the charts: the explicit selection
    /// while it stays visible, otherwise the first visible probe.
    pub fn chart_probe(&self) -> Option<String> {
        if let Some(probe) = &self.selected_probe {
            if self.registry.filter().is_visible(probe) {
                return Some(probe.clone());
            }
        }
        self.registry.visible_ids().into_iter().next()
    }

    pub fn range(&self) -> Range {
        self.range
    }

    /// Series keys the poll loop should refresh this tick: the charted
    /// metrics of the current chart probe over the active range.
    pub fn chart_keys(&self) -> Vec<SeriesKey> {
        let Some(probe) = self.chart_probe() else {
            return Vec::new();
        };
        Metric::CHARTED
            .iter()
            .map(|&metric| SeriesKey::new(probe.clone(), metric, self.range))
            .collect()
    }

    /// Apply a user command. Returns `true` when the chart selection
    /// changed and the series should be refreshed immediately.
    pub fn apply_command(&mut self, command: Command) -> bool {
        match command {
            Command::SetFilter(filter) => {
                let before = self.chart_probe();
                self.registry.set_filter(filter);
                // Snap the selection back into the visible set.
                if let Some(probe) = &self.selected_probe {
                    if !self.registry.filter().is_visible(probe) {
                        self.selected_probe = self.registry.visible_ids().into_iter().next();
                    }
                }
                // Only a different chart probe needs fresh series.
                self.chart_probe() != before
            }
            Command::SetRange(range) => {
                let changed = self.range != range;
                self.range = range;
                changed
            }
            Command::SelectProbe(probe) => {
                let changed = self.selected_probe.as_deref() != Some(probe.as_str());
                self.registry.note(&probe);
                self.selected_probe = Some(probe);
                changed
            }
            Command::Acknowledge(key) => {
                self.alerts.acknowledge(&key);
                false
            }
            Command::AcknowledgeAll => {
                self.alerts.acknowledge_all(self.registry.filter());
                false
            }
            Command::Shutdown => false,
        }
    }

    /// Derive the presentation projections at `now` (epoch seconds).
    pub fn project(&self, now: i64) -> Projections {
        let chart_probe = self.chart_probe();
        view::project(
            &self.snapshots,
            &self.registry,
            &self.series,
            &self.alerts,
            chart_probe.as_deref(),
            self.range,
            now,
            &self.thresholds,
            self.degraded,
        )
    }
}
