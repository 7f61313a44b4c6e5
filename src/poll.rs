//! Periodic refresh driver.
//!
//! The poll loop owns the [`Dashboard`] and is the single writer for all
//! of its stores. Three independent tickers (snapshot, alerts, series)
//! each fire on a fixed interval; a tick spawns its one fetch as a task
//! and the result comes back through an event channel, so a slow series
//! fetch never delays snapshot or alert updates. A failed tick logs the
//! failure, flags degraded connectivity and is simply retried at the
//! next schedule (no backoff, no cancellation). Overlapping ticks are
//! just concurrent requests: snapshot and alert merges are monotonic or
//! idempotent, and the series cache's sequence stamps discard whichever
//! response is stale.
//!
//! User commands arrive on an mpsc channel and every state change
//! publishes a fresh [`Projections`] snapshot on a watch channel for the
//! presentation adapter.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::app::{Command, Dashboard};
use crate::backend::{Backend, BackendError};
use crate::config::DashboardConfig;
use crate::data::{ConditionReport, PastAlert, Reading, SeriesKey, SeriesPoint};
use crate::view::Projections;

/// Result of one spawned fetch, fed back to the single writer task.
#[derive(Debug)]
enum PollEvent {
    Probes(Result<Vec<String>, BackendError>),
    Latest(Result<Vec<Reading>, BackendError>),
    Alerts(Result<Vec<ConditionReport>, BackendError>),
    History(Result<Vec<PastAlert>, BackendError>),
    Series {
        key: SeriesKey,
        seq: u64,
        result: Result<Vec<SeriesPoint>, BackendError>,
    },
    AckAll(Result<(), BackendError>),
}

/// Client half of a running poll loop: send commands, watch projections.
#[derive(Debug, Clone)]
pub struct DashboardHandle {
    pub commands: mpsc::Sender<Command>,
    pub projections: watch::Receiver<Projections>,
}

/// Everything the loop mutates, separated from the channels `run` polls
/// so the select arms can borrow it freely.
struct Engine {
    backend: Arc<dyn Backend>,
    dashboard: Dashboard,
    latest_limit: usize,
    history_limit: usize,
    events: mpsc::Sender<PollEvent>,
    projections: watch::Sender<Projections>,
}

impl Engine {
    fn spawn_probes(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = backend.probes().await;
            let _ = tx.send(PollEvent::Probes(result)).await;
        });
    }

    fn spawn_latest(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        let limit = self.latest_limit;
        tokio::spawn(async move {
            let result = backend.latest(limit).await;
            let _ = tx.send(PollEvent::Latest(result)).await;
        });
    }

    fn spawn_alerts(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = backend.active_alerts().await;
            let _ = tx.send(PollEvent::Alerts(result)).await;
        });
    }

    fn spawn_history(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events.clone();
        let limit = self.history_limit;
        tokio::spawn(async move {
            let result = backend.alert_history(limit).await;
            let _ = tx.send(PollEvent::History(result)).await;
        });
    }

    /// Issue a fetch for every chart key of the current selection.
    ///
    /// Each fetch carries the sequence stamp handed out at issue time;
    /// the cache rejects any completion that is no longer the latest.
    fn spawn_series_refresh(&mut self) {
        for key in self.dashboard.chart_keys() {
            let seq = self.dashboard.series.begin_fetch(&key);
            let backend = Arc::clone(&self.backend);
            let tx = self.events.clone();
            tokio::spawn(async move {
                let result = backend.series(&key.probe_id, key.metric, key.range).await;
                let _ = tx.send(PollEvent::Series { key, seq, result }).await;
            });
        }
    }

    fn apply_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Probes(Ok(ids)) => self.dashboard.apply_probe_list(ids),
            PollEvent::Latest(Ok(readings)) => self.dashboard.apply_latest(readings),
            PollEvent::Alerts(Ok(report)) => self.dashboard.apply_alert_report(report),
            PollEvent::History(Ok(past)) => self.dashboard.apply_alert_history(past),
            PollEvent::Series { key, seq, result } => match result {
                Ok(points) => {
                    self.dashboard.apply_series(&key, seq, points);
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "series fetch failed");
                    self.dashboard.fail_series(&key, seq);
                }
            },
            PollEvent::AckAll(Ok(())) => debug!("server-side ack_all confirmed"),
            PollEvent::AckAll(Err(err)) => {
                // Best-effort: the ledger was already updated optimistically.
                warn!(error = %err, "ack_all call failed");
            }
            PollEvent::Probes(Err(err)) => {
                warn!(error = %err, "probe list fetch failed");
                self.dashboard.mark_degraded();
            }
            PollEvent::Latest(Err(err)) => {
                warn!(error = %err, "latest readings fetch failed");
                self.dashboard.mark_degraded();
            }
            PollEvent::Alerts(Err(err)) => {
                warn!(error = %err, "active alerts fetch failed");
                self.dashboard.mark_degraded();
            }
            PollEvent::History(Err(err)) => {
                warn!(error = %err, "alert history fetch failed");
                self.dashboard.mark_degraded();
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        if command == Command::AcknowledgeAll {
            // Optimistic local update so the view changes immediately,
            // then the best-effort server call.
            self.dashboard.apply_command(command);
            let backend = Arc::clone(&self.backend);
            let tx = self.events.clone();
            tokio::spawn(async move {
                let result = backend.ack_all().await;
                let _ = tx.send(PollEvent::AckAll(result)).await;
            });
            return;
        }

        if self.dashboard.apply_command(command) {
            // Selection or range changed: refresh the charts now rather
            // than waiting for the next series tick.
            self.spawn_series_refresh();
        }
    }

    fn publish(&self) {
        let now = chrono::Utc::now().timestamp();
        self.projections.send_replace(self.dashboard.project(now));
    }
}

/// Owns the dashboard and drives its periodic refresh.
pub struct PollLoop {
    engine: Engine,
    commands: mpsc::Receiver<Command>,
    events: mpsc::Receiver<PollEvent>,
    snapshot_interval: Duration,
    alert_interval: Duration,
    series_interval: Duration,
}

impl PollLoop {
    /// Build a loop plus the handle a presentation adapter uses.
    pub fn new(
        backend: Arc<dyn Backend>,
        dashboard: Dashboard,
        config: &DashboardConfig,
    ) -> (Self, DashboardHandle) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(64);
        let (projection_tx, projection_rx) = watch::channel(Projections::default());

        let poll_loop = Self {
            engine: Engine {
                backend,
                dashboard,
                latest_limit: config.latest_limit,
                history_limit: config.history_limit,
                events: event_tx,
                projections: projection_tx,
            },
            commands: command_rx,
            events: event_rx,
            snapshot_interval: config.snapshot_interval(),
            alert_interval: config.alert_interval(),
            series_interval: config.series_interval(),
        };
        let handle = DashboardHandle {
            commands: command_tx,
            projections: projection_rx,
        };
        (poll_loop, handle)
    }

    /// Run until a [`Command::Shutdown`] arrives or every command sender
    /// is dropped.
    pub async fn run(self) -> Result<()> {
        let PollLoop {
            mut engine,
            mut commands,
            mut events,
            snapshot_interval,
            alert_interval,
            series_interval,
        } = self;

        let mut snapshot_tick = tokio::time::interval(snapshot_interval);
        let mut alert_tick = tokio::time::interval(alert_interval);
        let mut series_tick = tokio::time::interval(series_interval);
        snapshot_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        alert_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        series_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // One-shot startup pulls: probe list and alert history backfill.
        engine.spawn_probes();
        engine.spawn_history();
        engine.publish();

        loop {
            tokio::select! {
                _ = snapshot_tick.tick() => engine.spawn_latest(),
                _ = alert_tick.tick() => engine.spawn_alerts(),
                _ = series_tick.tick() => engine.spawn_series_refresh(),
                Some(event) = events.recv() => {
                    engine.apply_event(event);
                    engine.publish();
                }
                command = commands.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => {
                        engine.handle_command(command);
                        engine.publish();
                    }
                },
            }
        }

        debug!("poll loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AlertState, Metric, ProbeFilter, Range, Severity};
    use crate::view::StatusThresholds;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct MockBackend {
        probes: Vec<String>,
        readings: Mutex<Vec<Reading>>,
        conditions: Mutex<Vec<ConditionReport>>,
        fail_everything: AtomicBool,
        acked: AtomicBool,
    }

    impl MockBackend {
        fn check(&self) -> Result<(), BackendError> {
            if self.fail_everything.load(Ordering::SeqCst) {
                Err(BackendError::Connection("mock down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Backend for MockBackend {
        async fn probes(&self) -> Result<Vec<String>, BackendError> {
            self.check()?;
            Ok(self.probes.clone())
        }

        async fn latest(&self, _limit: usize) -> Result<Vec<Reading>, BackendError> {
            self.check()?;
            Ok(self.readings.lock().unwrap().clone())
        }

        async fn series(
            &self,
            _probe_id: &str,
            _metric: Metric,
            _range: Range,
        ) -> Result<Vec<SeriesPoint>, BackendError> {
            self.check()?;
            Ok(vec![SeriesPoint { ts: 100, value: 1.0 }])
        }

        async fn active_alerts(&self) -> Result<Vec<ConditionReport>, BackendError> {
            self.check()?;
            Ok(self.conditions.lock().unwrap().clone())
        }

        async fn alert_history(&self, _limit: usize) -> Result<Vec<PastAlert>, BackendError> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn ack_all(&self) -> Result<(), BackendError> {
            self.check()?;
            self.acked.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn description(&self) -> &str {
            "mock"
        }
    }

    fn reading(probe: &str, ts: i64) -> Reading {
        Reading {
            probe_id: probe.to_string(),
            ts,
            mode: None,
            temperature: Some(21.0),
            humidity: None,
            soil_moisture: None,
            light: None,
            air_quality: None,
        }
    }

    fn condition(probe: &str, code: &str) -> ConditionReport {
        ConditionReport {
            probe_id: probe.to_string(),
            code: code.to_string(),
            severity: Severity::Warn,
            message: "test".to_string(),
            ts: 50,
            value: None,
        }
    }

    fn fast_config() -> DashboardConfig {
        DashboardConfig {
            snapshot_interval_secs: 1,
            alert_interval_secs: 1,
            series_interval_secs: 1,
            ..DashboardConfig::default()
        }
    }

    async fn wait_for<F>(handle: &DashboardHandle, mut predicate: F) -> Projections
    where
        F: FnMut(&Projections) -> bool,
    {
        let mut rx = handle.projections.clone();
        tokio::time::timeout(Duration::from_secs(60), async {
            loop {
                {
                    let current = rx.borrow_and_update();
                    if predicate(&current) {
                        return current.clone();
                    }
                }
                rx.changed().await.expect("poll loop dropped projections");
            }
        })
        .await
        .expect("projection condition not reached")
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_populates_projections() {
        let backend = Arc::new(MockBackend {
            probes: vec!["sonde1".to_string(), "sonde2".to_string()],
            readings: Mutex::new(vec![reading("sonde1", 100)]),
            ..MockBackend::default()
        });
        let dashboard = Dashboard::new(StatusThresholds::default());
        let (poll_loop, handle) = PollLoop::new(backend, dashboard, &fast_config());
        let join = tokio::spawn(poll_loop.run());

        let projections = wait_for(&handle, |p| {
            p.status.len() == 2 && !p.charts.is_empty() && !p.charts[0].points.is_empty()
        })
        .await;

        assert_eq!(projections.status[0].probe_id, "sonde1");
        assert_eq!(projections.chart_probe.as_deref(), Some("sonde1"));
        assert_eq!(projections.charts.len(), Metric::CHARTED.len());

        handle.commands.send(Command::Shutdown).await.unwrap();
        join.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_failure_degrades_and_recovers() {
        let backend = Arc::new(MockBackend {
            probes: vec!["sonde1".to_string()],
            readings: Mutex::new(vec![reading("sonde1", 100)]),
            ..MockBackend::default()
        });
        backend.fail_everything.store(true, Ordering::SeqCst);

        let dashboard = Dashboard::new(StatusThresholds::default());
        let (poll_loop, handle) = PollLoop::new(Arc::clone(&backend) as _, dashboard, &fast_config());
        let join = tokio::spawn(poll_loop.run());

        wait_for(&handle, |p| p.degraded).await;

        // Stores were left unchanged by the failed ticks.
        assert!(handle.projections.borrow().status.is_empty());

        backend.fail_everything.store(false, Ordering::SeqCst);
        wait_for(&handle, |p| !p.degraded && !p.status.is_empty()).await;

        handle.commands.send(Command::Shutdown).await.unwrap();
        join.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_all_is_optimistic_and_calls_backend() {
        let backend = Arc::new(MockBackend {
            probes: vec!["sonde1".to_string()],
            conditions: Mutex::new(vec![condition("sonde1", "SOIL_LOW")]),
            ..MockBackend::default()
        });
        let dashboard = Dashboard::new(StatusThresholds::default());
        let (poll_loop, handle) = PollLoop::new(Arc::clone(&backend) as _, dashboard, &fast_config());
        let join = tokio::spawn(poll_loop.run());

        wait_for(&handle, |p| !p.active_alerts.is_empty()).await;

        handle.commands.send(Command::AcknowledgeAll).await.unwrap();
        let projections = wait_for(&handle, |p| p.active_alerts.is_empty()).await;
        assert_eq!(projections.alert_history.len(), 1);
        assert_eq!(projections.alert_history[0].state, AlertState::Acknowledged);

        wait_for(&handle, |_| backend.acked.load(Ordering::SeqCst)).await;

        handle.commands.send(Command::Shutdown).await.unwrap();
        join.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_command_reprojects() {
        let backend = Arc::new(MockBackend {
            probes: vec!["sonde1".to_string(), "sonde2".to_string()],
            ..MockBackend::default()
        });
        let dashboard = Dashboard::new(StatusThresholds::default());
        let (poll_loop, handle) = PollLoop::new(backend, dashboard, &fast_config());
        let join = tokio::spawn(poll_loop.run());

        wait_for(&handle, |p| p.status.len() == 2).await;

        handle
            .commands
            .send(Command::SetFilter(ProbeFilter::select(["sonde2"])))
            .await
            .unwrap();
        let projections = wait_for(&handle, |p| p.status.len() == 1).await;
        assert_eq!(projections.status[0].probe_id, "sonde2");
        assert_eq!(projections.chart_probe.as_deref(), Some("sonde2"));

        // Clearing the selection shows everything again.
        handle
            .commands
            .send(Command::SetFilter(ProbeFilter::all()))
            .await
            .unwrap();
        wait_for(&handle, |p| p.status.len() == 2).await;

        handle.commands.send(Command::Shutdown).await.unwrap();
        join.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_range_command_refreshes_series() {
        let backend = Arc::new(MockBackend {
            probes: vec!["sonde1".to_string()],
            ..MockBackend::default()
        });
        let dashboard = Dashboard::new(StatusThresholds::default());
        let (poll_loop, handle) = PollLoop::new(backend, dashboard, &fast_config());
        let join = tokio::spawn(poll_loop.run());

        wait_for(&handle, |p| !p.status.is_empty()).await;

        handle
            .commands
            .send(Command::SetRange(Range::Hour1))
            .await
            .unwrap();
        let projections = wait_for(&handle, |p| {
            p.range == Range::Hour1 && p.charts.iter().any(|c| !c.points.is_empty())
        })
        .await;
        assert_eq!(projections.range, Range::Hour1);

        handle.commands.send(Command::Shutdown).await.unwrap();
        join.await.unwrap().unwrap();
    }
}
