//! Backend abstraction for the telemetry API.
//!
//! The poll loop only depends on the [`Backend`] trait; the shipped
//! implementation is [`HttpBackend`], which consumes the backend's HTTP
//! surface. Tests substitute in-memory implementations.

mod http;

pub use http::HttpBackend;

use std::fmt::Debug;

use async_trait::async_trait;
use thiserror::Error;

use crate::data::{ConditionReport, Metric, PastAlert, Range, Reading, SeriesPoint};

/// Errors from a backend fetch.
///
/// None of these are fatal: a failed fetch degrades one refresh stream
/// for one tick and is retried on the next scheduled tick.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request-level failure (network error, invalid request).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The backend answered with a non-success status. Never treated as
    /// an empty result.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body did not match the expected shape.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Could not reach the backend at all.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_connect() {
            BackendError::Connection(err.to_string())
        } else if err.is_decode() {
            BackendError::Parse(err.to_string())
        } else {
            BackendError::Http(err.to_string())
        }
    }
}

/// A telemetry backend serving probe snapshots, series and alerts.
///
/// All read operations are idempotent; `ack_all` is the only mutating
/// call and is best-effort (the ledger is updated optimistically on the
/// client before the call completes).
#[async_trait]
pub trait Backend: Send + Sync + Debug {
    /// Known probe ids, in backend order.
    async fn probes(&self) -> Result<Vec<String>, BackendError>;

    /// Most recent readings, at most `limit` entries. May contain fewer
    /// than one entry per known probe.
    async fn latest(&self, limit: usize) -> Result<Vec<Reading>, BackendError>;

    /// Time-ordered series for one metric of one probe over a range.
    async fn series(
        &self,
        probe_id: &str,
        metric: Metric,
        range: Range,
    ) -> Result<Vec<SeriesPoint>, BackendError>;

    /// Currently-true alert conditions.
    async fn active_alerts(&self) -> Result<Vec<ConditionReport>, BackendError>;

    /// Past (recovered or acknowledged) alert records, newest first.
    async fn alert_history(&self, limit: usize) -> Result<Vec<PastAlert>, BackendError>;

    /// Acknowledge all currently active alerts server-side.
    async fn ack_all(&self) -> Result<(), BackendError>;

    /// Human-readable description of the backend, for status display.
    fn description(&self) -> &str;
}
