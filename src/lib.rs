//! # probewatch
//!
//! State-reconciliation and lifecycle engine for a field-sensor
//! telemetry dashboard.
//!
//! probewatch polls a telemetry backend for readings from multiple
//! field probes (temperature, air humidity, soil moisture, light,
//! air quality), merges them into a consistent filterable view model,
//! tracks the alert lifecycle across polling cycles, and manages
//! per-range chart series without races between overlapping fetches.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          PollLoop                             │
//! │  ┌─────────┐    ┌───────────┐    ┌──────┐    ┌─────────────┐ │
//! │  │ backend │───▶│   data    │───▶│ view │───▶│ watch chan  │ │
//! │  │ (fetch) │    │ (stores)  │    │(pure)│    │(projections)│ │
//! │  └─────────┘    └───────────┘    └──────┘    └──────┬──────┘ │
//! │       ▲                ▲                            │        │
//! │       │           command chan ◀── presentation ◀───┘        │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`backend`]**: the [`Backend`] trait over the telemetry HTTP API,
//!   with [`HttpBackend`] as the shipped implementation
//! - **[`data`]**: the four stores: latest readings ([`SnapshotStore`]),
//!   known probes and filter ([`ProbeRegistry`]), chart series with
//!   stale-response rejection ([`SeriesCache`]), and the alert lifecycle
//!   ([`AlertLedger`])
//! - **[`app`]**: the [`Dashboard`] composition root and the [`Command`]
//!   interface for user actions
//! - **[`poll`]**: the [`PollLoop`] driving periodic refresh and
//!   publishing [`Projections`] snapshots
//! - **[`view`]**: pure projection of store state into the status list,
//!   probe cards, table and chart payloads
//!
//! ## Concurrency model
//!
//! All store mutation happens on the poll loop's single task. Fetches
//! run as spawned tasks whose results come back through an event
//! channel, so nothing ever mutates a store mid-fetch. Two mechanisms
//! make overlapping fetches safe: snapshot and alert merges are
//! monotonic/idempotent, and each series fetch carries a per-key
//! sequence stamp so only the most recently issued request's response
//! is ever applied.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use probewatch::{Dashboard, DashboardConfig, HttpBackend, PollLoop};
//!
//! # tokio_test::block_on(async {
//! let config = DashboardConfig::default();
//! let backend = Arc::new(HttpBackend::new(&config.base_url)?);
//! let dashboard = Dashboard::new(config.thresholds());
//! let (poll_loop, handle) = PollLoop::new(backend, dashboard, &config);
//!
//! tokio::spawn(poll_loop.run());
//!
//! // A presentation adapter consumes projection snapshots:
//! let mut projections = handle.projections.clone();
//! projections.changed().await?;
//! println!("{} visible probes", projections.borrow().status.len());
//! # Ok::<_, anyhow::Error>(())
//! # });
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod data;
pub mod poll;
pub mod view;

// Re-export main types for convenience
pub use app::{Command, Dashboard};
pub use backend::{Backend, BackendError, HttpBackend};
pub use config::DashboardConfig;
pub use data::{
    Alert, AlertKey, AlertLedger, AlertState, ConditionReport, Metric, PastAlert, ProbeFilter,
    ProbeRegistry, Range, Reading, SeriesCache, SeriesKey, SeriesPoint, Severity, SnapshotStore,
};
pub use poll::{DashboardHandle, PollLoop};
pub use view::{Presence, ProbeCard, Projections, StatusRow, StatusThresholds};
