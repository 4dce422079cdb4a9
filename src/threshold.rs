use crate::diff::{PercentChange, ReconciledPair, classify_change, reconcile};
use crate::helpers::compare_floats;
use crate::models::CostSeries;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum increase in USD, exclusive
    pub absolute: f64,
    /// Minimum increase in percent, exclusive
    pub percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            absolute: 0.5,
            percent: 5.0,
        }
    }
}

/// An entity whose growth is large enough to deserve a breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedEntity {
    pub name: String,
    pub difference: f64,
    pub change: PercentChange,
}

/// Cost of every entity in the last two periods of the series.
///
/// Empty when the series has fewer than two periods.
pub fn last_two_periods(series: &CostSeries) -> Vec<ReconciledPair> {
    let count = series.period_count();
    if count < 2 {
        return Vec::new();
    }
    let previous = series.column(count - 2);
    let current = series.column(count - 1);
    reconcile(&previous, &current, |(name, _)| name.as_str(), |(_, cost)| *cost)
}

/// Entities that grew by more than both thresholds, largest increase first.
///
/// A cost that appears from nothing passes the percentage gate but must still
/// clear the absolute one.
pub fn select_growing(pairs: &[ReconciledPair], thresholds: &Thresholds) -> Vec<SelectedEntity> {
    let mut selected: Vec<SelectedEntity> = pairs
        .iter()
        .filter_map(|pair| {
            let difference = pair.difference();
            let change = classify_change(pair.first, pair.second);
            let keep = difference > thresholds.absolute && change.exceeds(thresholds.percent);
            tracing::debug!(
                entity = %pair.key,
                previous = pair.first,
                current = pair.second,
                difference,
                ?change,
                keep,
                "threshold check"
            );
            keep.then(|| SelectedEntity {
                name: pair.key.clone(),
                difference,
                change,
            })
        })
        .collect();

    selected.sort_by(|a, b| compare_floats(b.difference, a.difference));
    selected
}
