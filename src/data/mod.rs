//! Domain models and in-memory stores.
//!
//! Each store owns one slice of the dashboard state and is mutated only
//! by its own refresh path (plus explicit user actions), never by the
//! view layer:
//!
//! - [`reading`]: wire types shared with the backend ([`Reading`],
//!   [`SeriesPoint`], [`Metric`], [`Range`], alert report shapes)
//! - [`registry`]: known probe ids and the visibility filter
//! - [`snapshot`]: newest reading per probe, monotonic on timestamps
//! - [`series`]: per-(probe, metric, range) chart data with
//!   stale-response rejection
//! - [`alerts`]: alert records and their lifecycle

pub mod alerts;
pub mod reading;
pub mod registry;
pub mod series;
pub mod snapshot;

pub use alerts::{Alert, AlertKey, AlertLedger, AlertState};
pub use reading::{ConditionReport, Metric, PastAlert, Range, Reading, SeriesPoint, Severity};
pub use registry::{natural_cmp, ProbeFilter, ProbeRegistry};
pub use series::{SeriesCache, SeriesKey, SeriesState, MAX_SERIES_POINTS};
pub use snapshot::SnapshotStore;
