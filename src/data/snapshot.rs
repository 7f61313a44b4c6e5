//! Latest-reading store, merged from periodic snapshot pulls.

use std::collections::BTreeMap;

use super::reading::Reading;

/// Holds the single most recent reading per probe.
///
/// Merges are monotonic on the reading timestamp: a reading only replaces
/// the stored one when its timestamp is strictly newer, so out-of-order
/// or repeated pulls can never regress the view. Probes absent from a
/// pull keep their last known reading; staleness stays visible through
/// the stored timestamp rather than being erased.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    latest: BTreeMap<String, Reading>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of readings, keeping the newest per probe.
    ///
    /// Returns the number of probes whose stored reading changed.
    pub fn merge<I>(&mut self, readings: I) -> usize
    where
        I: IntoIterator<Item = Reading>,
    {
        let mut updated = 0;
        for reading in readings {
            match self.latest.get(&reading.probe_id) {
                Some(stored) if stored.ts >= reading.ts => {}
                _ => {
                    self.latest.insert(reading.probe_id.clone(), reading);
                    updated += 1;
                }
            }
        }
        updated
    }

    /// The stored reading for a probe, if any has been seen.
    pub fn latest_for(&self, probe_id: &str) -> Option<&Reading> {
        self.latest.get(probe_id)
    }

    /// Ids of every probe ever seen, in lexicographic order.
    pub fn known_probe_ids(&self) -> impl Iterator<Item = &str> {
        self.latest.keys().map(String::as_str)
    }

    /// All stored readings, keyed by probe id.
    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.latest.values()
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(probe: &str, ts: i64, temp: f64) -> Reading {
        Reading {
            probe_id: probe.to_string(),
            ts,
            mode: None,
            temperature: Some(temp),
            humidity: None,
            soil_moisture: None,
            light: None,
            air_quality: None,
        }
    }

    #[test]
    fn test_merge_stores_new_probe() {
        let mut store = SnapshotStore::new();
        assert_eq!(store.merge([reading("sonde1", 100, 24.0)]), 1);

        let stored = store.latest_for("sonde1").unwrap();
        assert_eq!(stored.ts, 100);
        assert_eq!(stored.temperature, Some(24.0));
    }

    #[test]
    fn test_merge_rejects_older_timestamp() {
        let mut store = SnapshotStore::new();
        store.merge([reading("sonde1", 100, 24.0)]);

        assert_eq!(store.merge([reading("sonde1", 90, 99.0)]), 0);
        let stored = store.latest_for("sonde1").unwrap();
        assert_eq!(stored.ts, 100);
        assert_eq!(stored.temperature, Some(24.0));
    }

    #[test]
    fn test_merge_rejects_equal_timestamp() {
        let mut store = SnapshotStore::new();
        store.merge([reading("sonde1", 100, 24.0)]);

        assert_eq!(store.merge([reading("sonde1", 100, 50.0)]), 0);
        assert_eq!(store.latest_for("sonde1").unwrap().temperature, Some(24.0));
    }

    #[test]
    fn test_merge_is_monotonic_across_calls() {
        let mut store = SnapshotStore::new();
        for ts in [50, 120, 80, 120, 119, 121] {
            store.merge([reading("sonde1", ts, ts as f64)]);
        }
        assert_eq!(store.latest_for("sonde1").unwrap().ts, 121);
    }

    #[test]
    fn test_absent_probe_keeps_last_reading() {
        let mut store = SnapshotStore::new();
        store.merge([reading("sonde1", 100, 24.0), reading("sonde2", 100, 18.0)]);

        // Next pull only mentions sonde2; sonde1 must not be dropped.
        store.merge([reading("sonde2", 110, 18.5)]);
        assert_eq!(store.latest_for("sonde1").unwrap().ts, 100);
        assert_eq!(store.latest_for("sonde2").unwrap().ts, 110);
    }

    #[test]
    fn test_known_probe_ids_sorted() {
        let mut store = SnapshotStore::new();
        store.merge([
            reading("sondeB", 1, 0.0),
            reading("sondeA", 1, 0.0),
            reading("sondeC", 1, 0.0),
        ]);
        let ids: Vec<&str> = store.known_probe_ids().collect();
        assert_eq!(ids, vec!["sondeA", "sondeB", "sondeC"]);
    }

    #[test]
    fn test_latest_for_unknown_probe() {
        let store = SnapshotStore::new();
        assert!(store.latest_for("ghost").is_none());
    }
}
