//! Month-over-month differences.
//!
//! Everything here works on two "mappings" from name to cost, one per
//! period, and treats a name missing from one side as zero cost there.

use crate::domain::ChangeDirection;
use crate::helpers::compare_floats;
use crate::models::DiffRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Added to the previous value before dividing so a zero baseline never divides by zero
pub const PERCENT_EPSILON: f64 = 1e-9;

/// A name seen in either period with its cost on both sides
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledPair {
    pub key: String,
    pub first: f64,
    pub second: f64,
}

impl ReconciledPair {
    pub fn difference(&self) -> f64 {
        self.second - self.first
    }

    /// Materiality measure that ignores the sign of the change
    pub fn combined(&self) -> f64 {
        self.first + self.second
    }
}

/// Union the keys of two record lists, defaulting a missing side to zero.
///
/// `key` and `value` pull the name and the cost out of a record. Records that
/// share a key within one list are summed. Output order is first-seen:
/// keys of `first`, then keys only present in `second`.
pub fn reconcile<T, K, V>(first: &[T], second: &[T], key: K, value: V) -> Vec<ReconciledPair>
where
    K: Fn(&T) -> &str,
    V: Fn(&T) -> f64,
{
    let mut pairs: Vec<ReconciledPair> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (record, is_first) in first
        .iter()
        .map(|r| (r, true))
        .chain(second.iter().map(|r| (r, false)))
    {
        let name = key(record);
        let slot = match index.get(name) {
            Some(&slot) => slot,
            None => {
                pairs.push(ReconciledPair {
                    key: name.to_string(),
                    first: 0.0,
                    second: 0.0,
                });
                index.insert(name.to_string(), pairs.len() - 1);
                pairs.len() - 1
            }
        };
        if is_first {
            pairs[slot].first += value(record);
        } else {
            pairs[slot].second += value(record);
        }
    }

    pairs
}

pub fn diff_totals(previous: f64, current: f64) -> f64 {
    current - previous
}

/// Percentage change with the epsilon-padded denominator. Saturates to a very
/// large finite number when `previous` is zero.
pub fn percent_change(previous: f64, current: f64) -> f64 {
    (current - previous) / (previous + PERCENT_EPSILON) * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "percent", rename_all = "snake_case")]
pub enum PercentChange {
    /// Nothing was spent in the previous period and something is now
    NewCost,
    Ratio(f64),
}

impl PercentChange {
    pub fn exceeds(&self, threshold: f64) -> bool {
        match self {
            PercentChange::NewCost => true,
            PercentChange::Ratio(pct) => *pct > threshold,
        }
    }
}

pub fn classify_change(previous: f64, current: f64) -> PercentChange {
    if previous == 0.0 && current > 0.0 {
        PercentChange::NewCost
    } else {
        PercentChange::Ratio(percent_change(previous, current))
    }
}

/// One record per name in either map, largest increase first
pub fn diff_map<K: AsRef<str>>(previous: &[(K, f64)], current: &[(K, f64)]) -> Vec<DiffRecord> {
    let mut records: Vec<DiffRecord> = reconcile(
        previous,
        current,
        |(name, _)| name.as_ref(),
        |(_, cost)| *cost,
    )
    .into_iter()
    .map(|pair| {
        let difference = pair.difference();
        DiffRecord {
            name: pair.key,
            previous: pair.first,
            current: pair.second,
            difference,
            direction: ChangeDirection::of(difference),
        }
    })
    .collect();

    sort_by_difference(&mut records);
    records
}

pub fn sort_by_difference(records: &mut [DiffRecord]) {
    records.sort_by(|a, b| compare_floats(b.difference, a.difference));
}
