//! # Time-windowed aggregation
//!
//! Selects the records of the last `window` relative to a reference instant
//! and ranks `final_tag`s by record count or by summed source weight.
//!
//! The reference defaults to the newest timestamp in the data, not the wall
//! clock, so reruns over a historical file select the same rows.
//!
//! Ranking is a stable descending sort: tags with equal totals keep the order
//! in which they first appear in the selection.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::AddAssign;

use chrono::{DateTime, Duration, Utc};

use crate::labels::Label;
use crate::record::SignalRecord;
use crate::source_weights::SourceWeights;

/// Newest valid timestamp in `records`.
pub fn reference_time(records: &[SignalRecord]) -> Option<DateTime<Utc>> {
    records.iter().filter_map(|r| r.published_at).max()
}

/// Records with `published_at >= reference - window_days`.
///
/// `reference = None` uses [`reference_time`]. Records without a timestamp
/// never qualify; if none has one the selection is empty.
pub fn select_recent(
    records: &[SignalRecord],
    window_days: u32,
    reference: Option<DateTime<Utc>>,
) -> Vec<&SignalRecord> {
    let Some(reference) = reference.or_else(|| reference_time(records)) else {
        return Vec::new();
    };
    // A window reaching before the earliest representable instant covers everything.
    let cutoff = reference.checked_sub_signed(Duration::days(i64::from(window_days)));
    records
        .iter()
        .filter(|r| {
            r.published_at
                .is_some_and(|ts| cutoff.map_or(true, |c| ts >= c))
        })
        .collect()
}

/// Per-tag totals in descending order.
#[derive(Debug, Clone, PartialEq)]
pub struct TagTotals<T> {
    entries: Vec<(Label, T)>,
}

impl<T> Default for TagTotals<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Copy + PartialOrd> TagTotals<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&Label, T)> {
        self.entries.iter().map(|(l, v)| (l, *v))
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.entries.iter().map(|(l, _)| l)
    }

    pub fn get(&self, label: &Label) -> Option<T> {
        self.entries.iter().find(|(l, _)| l == label).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first `n` entries.
    pub fn top(&self, n: usize) -> Self {
        Self {
            entries: self.entries.iter().take(n).cloned().collect(),
        }
    }

    pub fn into_vec(self) -> Vec<(Label, T)> {
        self.entries
    }
}

/// Unweighted: one per record.
pub fn count_by_tag(records: &[&SignalRecord]) -> TagTotals<usize> {
    rank(records.iter().map(|r| (&r.final_tag, 1usize)))
}

/// Weighted momentum: each record contributes its source's weight.
pub fn weighted_by_tag(records: &[&SignalRecord], weights: &SourceWeights) -> TagTotals<f64> {
    rank(
        records
            .iter()
            .map(|r| (&r.final_tag, f64::from(weights.weight_for(&r.source)))),
    )
}

fn rank<'a, T, I>(items: I) -> TagTotals<T>
where
    T: Copy + Default + AddAssign + PartialOrd,
    I: Iterator<Item = (&'a Label, T)>,
{
    let mut entries: Vec<(Label, T)> = Vec::new();
    let mut index: HashMap<&'a Label, usize> = HashMap::new();
    for (label, value) in items {
        let i = *index.entry(label).or_insert_with(|| {
            entries.push((label.clone(), T::default()));
            entries.len() - 1
        });
        entries[i].1 += value;
    }
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    TagTotals { entries }
}
