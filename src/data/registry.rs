//! Known-probe set and the user's visibility filter.

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Visibility filter over probe ids.
///
/// An empty selection is the distinguished "all probes" value, never
/// "no probes": deselecting every item in a picker means "show all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeFilter {
    selected: BTreeSet<String>,
}

impl ProbeFilter {
    /// The all-sentinel filter: every probe is visible.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict visibility to the given ids. An empty iterator yields
    /// the all-sentinel.
    pub fn select<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this is the "all probes" sentinel.
    pub fn is_all(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether a probe id passes the filter.
    pub fn is_visible(&self, probe_id: &str) -> bool {
        self.selected.is_empty() || self.selected.contains(probe_id)
    }

    /// The explicitly selected ids (empty for the all-sentinel).
    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }
}

/// The set of probe ids known to the dashboard plus the active filter.
///
/// Membership is established the first time an id appears in a snapshot
/// pull or in an explicit probe-list pull; ids are never forgotten.
#[derive(Debug, Clone, Default)]
pub struct ProbeRegistry {
    known: BTreeSet<String>,
    filter: ProbeFilter,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch of probe ids as known.
    pub fn absorb<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(ids.into_iter().map(Into::into));
    }

    /// Record a single probe id as known.
    pub fn note(&mut self, probe_id: &str) {
        if !self.known.contains(probe_id) {
            self.known.insert(probe_id.to_string());
        }
    }

    /// All known ids in lexicographic order.
    pub fn known_ids(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(String::as_str)
    }

    pub fn filter(&self) -> &ProbeFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: ProbeFilter) {
        self.filter = filter;
    }

    /// Known ids passing the filter, in natural display order
    /// (so "probe2" sorts before "probe10").
    pub fn visible_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .known
            .iter()
            .filter(|id| self.filter.is_visible(id))
            .cloned()
            .collect();
        ids.sort_by(|a, b| natural_cmp(a, b));
        ids
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// Lexicographic-numeric ordering: digit runs compare as numbers,
/// everything else compares bytewise.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ia = a.as_bytes().iter().peekable();
    let mut ib = b.as_bytes().iter().peekable();

    loop {
        match (ia.peek().copied(), ib.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&ca), Some(&cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let run_a = take_digits(&mut ia);
                    let run_b = take_digits(&mut ib);
                    let trim_a = run_a.trim_start_matches('0');
                    let trim_b = run_b.trim_start_matches('0');
                    // Longer digit run (after leading zeros) is the larger number
                    let ord = trim_a
                        .len()
                        .cmp(&trim_b.len())
                        .then_with(|| trim_a.cmp(trim_b))
                        .then_with(|| run_a.cmp(&run_b));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                } else {
                    let ord = ca.cmp(&cb);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    ia.next();
                    ib.next();
                }
            }
        }
    }
}

fn take_digits(iter: &mut std::iter::Peekable<std::slice::Iter<'_, u8>>) -> String {
    let mut run = String::new();
    while let Some(&&c) = iter.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c as char);
        iter.next();
    }
    run
}
