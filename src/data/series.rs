//! Per-(probe, metric, range) time-series cache with stale-response
//! rejection.
//!
//! Several fetches for the same key can be in flight at once (the user
//! switching range twice quickly, or a slow tick overlapping the next
//! one). Each fetch is stamped with a per-key sequence number when it is
//! issued; a completion is applied only when its stamp matches the most
//! recently issued one, so the last-issued request always wins no matter
//! in which order responses arrive.

use std::collections::HashMap;

use tracing::debug;

use super::reading::{Metric, Range, SeriesPoint};

/// Upper bound on stored points per key: 30 days at one point per 15
/// minutes. Longer payloads keep their newest points.
pub const MAX_SERIES_POINTS: usize = 2880;

/// Cache key: one metric of one probe over one range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub probe_id: String,
    pub metric: Metric,
    pub range: Range,
}

impl SeriesKey {
    pub fn new(probe_id: impl Into<String>, metric: Metric, range: Range) -> Self {
        Self {
            probe_id: probe_id.into(),
            metric,
            range,
        }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.probe_id, self.metric, self.range)
    }
}

#[derive(Debug, Clone, Default)]
struct SeriesEntry {
    points: Vec<SeriesPoint>,
    /// Stamp of the most recently issued fetch for this key.
    last_issued: u64,
    /// Whether the latest completed fetch failed (stale points are kept).
    fetch_failed: bool,
}

/// The most recently completed points for a cached key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesState<'a> {
    pub points: &'a [SeriesPoint],
    pub fetch_failed: bool,
}

/// Cache of fetched series, one bounded ordered sequence per key.
#[derive(Debug, Clone, Default)]
pub struct SeriesCache {
    entries: HashMap<SeriesKey, SeriesEntry>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a new fetch for `key` and return its sequence number.
    ///
    /// The returned stamp must be passed back to [`apply`](Self::apply)
    /// or [`fail`](Self::fail) when the fetch completes.
    pub fn begin_fetch(&mut self, key: &SeriesKey) -> u64 {
        let entry = self.entries.entry(key.clone()).or_default();
        entry.last_issued += 1;
        entry.last_issued
    }

    /// Apply a successful fetch.
    ///
    /// Returns `false` when the response is stale (a newer fetch for the
    /// same key has been issued since); stale responses are discarded
    /// without touching the cached points.
    pub fn apply(&mut self, key: &SeriesKey, seq: u64, mut points: Vec<SeriesPoint>) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        if seq != entry.last_issued {
            debug!(key = %key, seq, latest = entry.last_issued, "discarding stale series response");
            return false;
        }

        points.sort_unstable_by_key(|p| p.ts);
        if points.len() > MAX_SERIES_POINTS {
            points.drain(..points.len() - MAX_SERIES_POINTS);
        }
        entry.points = points;
        entry.fetch_failed = false;
        true
    }

    /// Record a failed fetch.
    ///
    /// Keeps the previously cached points so the chart can keep showing
    /// stale data, flagged as failed. A stale failure (superseded by a
    /// newer fetch) is ignored entirely.
    pub fn fail(&mut self, key: &SeriesKey, seq: u64) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        if seq != entry.last_issued {
            return false;
        }
        entry.fetch_failed = true;
        true
    }

    /// The most recently completed points for `key`, or an empty slice
    /// if nothing has completed yet.
    pub fn current(&self, key: &SeriesKey) -> SeriesState<'_> {
        match self.entries.get(key) {
            Some(entry) => SeriesState {
                points: &entry.points,
                fetch_failed: entry.fetch_failed,
            },
            None => SeriesState::default(),
        }
    }
}
