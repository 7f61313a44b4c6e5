//! Alert records and their lifecycle across polling cycles.
//!
//! An alert is identified by its (probe, condition code) pair and moves
//! through three states:
//!
//! ```text
//! report contains key          report omits key
//!        │                            │
//!        ▼                            ▼
//!     Active ──────────────────▶ Recovered
//!        │                            │
//!        │ acknowledge                │ acknowledge
//!        ▼                            ▼
//!              Acknowledged
//! ```
//!
//! Acknowledged is terminal for an occurrence; a strictly newer detection
//! of the same key re-opens the record as a fresh occurrence. Records are
//! never deleted, so the active and history views together always hold
//! exactly one record per key ever reported.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::reading::{ConditionReport, PastAlert, Severity};
use super::registry::ProbeFilter;

/// Composite alert identity, stable across lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertKey {
    pub probe_id: String,
    pub code: String,
}

impl AlertKey {
    pub fn new(probe_id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            probe_id: probe_id.into(),
            code: code.into(),
        }
    }
}

/// Lifecycle state of an alert record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// Condition currently true and not yet dismissed.
    Active,
    /// Condition no longer reported, not yet dismissed.
    Recovered,
    /// Dismissed by the user; terminal for this occurrence.
    Acknowledged,
}

/// One alert record with its current lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub key: AlertKey,
    pub severity: Severity,
    pub message: String,
    /// When this occurrence was first detected, epoch seconds.
    pub first_seen: i64,
    /// When the condition was last reported true, epoch seconds.
    pub last_seen: i64,
    pub state: AlertState,
}

/// Store of every alert ever reported, keyed by (probe, code).
#[derive(Debug, Clone, Default)]
pub struct AlertLedger {
    alerts: BTreeMap<AlertKey, Alert>,
}

impl AlertLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile a backend report of currently-true conditions.
    ///
    /// Conditions in the report are created or re-opened as active;
    /// active records absent from the report transition to recovered.
    /// Applying the same report twice leaves the ledger unchanged after
    /// the second call.
    pub fn apply_report(&mut self, report: &[ConditionReport]) {
        let mut reported: BTreeSet<AlertKey> = BTreeSet::new();

        for condition in report {
            let key = AlertKey::new(&condition.probe_id, &condition.code);
            reported.insert(key.clone());

            match self.alerts.get_mut(&key) {
                None => {
                    self.alerts.insert(
                        key.clone(),
                        Alert {
                            key,
                            severity: condition.severity,
                            message: condition.message.clone(),
                            first_seen: condition.ts,
                            last_seen: condition.ts,
                            state: AlertState::Active,
                        },
                    );
                }
                Some(alert) => match alert.state {
                    AlertState::Active | AlertState::Recovered => {
                        alert.state = AlertState::Active;
                        alert.severity = condition.severity;
                        alert.message = condition.message.clone();
                        alert.last_seen = alert.last_seen.max(condition.ts);
                    }
                    // An acknowledged record re-opens only on a strictly
                    // newer detection; a re-poll of the same occurrence
                    // carries the same timestamp and is left alone.
                    AlertState::Acknowledged => {
                        if condition.ts > alert.last_seen {
                            alert.state = AlertState::Active;
                            alert.severity = condition.severity;
                            alert.message = condition.message.clone();
                            alert.first_seen = condition.ts;
                            alert.last_seen = condition.ts;
                        }
                    }
                },
            }
        }

        for (key, alert) in &mut self.alerts {
            if alert.state == AlertState::Active && !reported.contains(key) {
                alert.state = AlertState::Recovered;
            }
        }
    }

    /// Acknowledge one alert. Unknown or already-acknowledged keys are a
    /// no-op (a concurrent path may have acknowledged it first).
    ///
    /// Returns whether a record changed state.
    pub fn acknowledge(&mut self, key: &AlertKey) -> bool {
        match self.alerts.get_mut(key) {
            Some(alert) if alert.state != AlertState::Acknowledged => {
                alert.state = AlertState::Acknowledged;
                true
            }
            _ => false,
        }
    }

    /// Acknowledge every non-acknowledged alert whose probe passes the
    /// filter. Alerts for filtered-out probes are untouched.
    ///
    /// Returns the number of records acknowledged.
    pub fn acknowledge_all(&mut self, filter: &ProbeFilter) -> usize {
        let mut count = 0;
        for alert in self.alerts.values_mut() {
            if alert.state != AlertState::Acknowledged && filter.is_visible(&alert.key.probe_id) {
                alert.state = AlertState::Acknowledged;
                count += 1;
            }
        }
        count
    }

    /// Merge backend history records for keys this ledger has not seen.
    ///
    /// The local lifecycle wins for known keys; history only backfills
    /// records from before the dashboard started.
    pub fn absorb_history(&mut self, past: &[PastAlert]) -> usize {
        let mut added = 0;
        for record in past {
            let key = AlertKey::new(&record.probe_id, &record.code);
            if self.alerts.contains_key(&key) {
                continue;
            }
            let state = if record.acknowledged {
                AlertState::Acknowledged
            } else {
                AlertState::Recovered
            };
            self.alerts.insert(
                key.clone(),
                Alert {
                    key,
                    severity: record.severity,
                    message: record.message.clone(),
                    first_seen: record.ts,
                    last_seen: record.ts,
                    state,
                },
            );
            added += 1;
        }
        added
    }

    /// Look up one alert record.
    pub fn get(&self, key: &AlertKey) -> Option<&Alert> {
        self.alerts.get(key)
    }

    /// All non-acknowledged alerts, most severe first, then most
    /// recently seen first.
    pub fn active_view(&self) -> Vec<&Alert> {
        let mut active: Vec<&Alert> = self
            .alerts
            .values()
            .filter(|a| a.state != AlertState::Acknowledged)
            .collect();
        active.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
        });
        active
    }

    /// All acknowledged or recovered alerts, most recently seen first.
    pub fn history_view(&self) -> Vec<&Alert> {
        let mut history: Vec<&Alert> = self
            .alerts
            .values()
            .filter(|a| a.state != AlertState::Active)
            .collect();
        history.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        history
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
