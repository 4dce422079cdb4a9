use crate::domain::{ChangeDirection, GroupingDimension, Period};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One grouped line item as returned by the cost source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostGroup {
    pub key: String,
    pub amount: f64,
}

impl CostGroup {
    pub fn new(key: impl Into<String>, amount: f64) -> Self {
        Self {
            key: key.into(),
            amount,
        }
    }
}

/// All groups reported for a single period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodGroups {
    pub period: Period,
    pub groups: Vec<CostGroup>,
}

impl PeriodGroups {
    pub fn new(period: Period, groups: Vec<CostGroup>) -> Self {
        Self { period, groups }
    }
}

/// Entity name to per-period cost vector, kept in first-seen order.
///
/// Every vector has exactly `periods.len()` slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostSeries {
    periods: Vec<Period>,
    entries: Vec<(String, Vec<f64>)>,
    index: HashMap<String, usize>,
}

impl CostSeries {
    pub fn new(periods: Vec<Period>) -> Self {
        Self {
            periods,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    /// Add `amount` to `name` in slot `period_index`, creating a zeroed vector on first sight
    pub fn add(&mut self, name: &str, period_index: usize, amount: f64) {
        let width = self.periods.len();
        let slot = match self.index.get(name) {
            Some(&slot) => slot,
            None => {
                self.entries.push((name.to_string(), vec![0.0; width]));
                self.index.insert(name.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        if let Some(value) = self.entries[slot].1.get_mut(period_index) {
            *value += amount;
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.index
            .get(name)
            .map(|&slot| self.entries[slot].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.entries
            .iter()
            .map(|(name, costs)| (name.as_str(), costs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (name, cost) pairs for one period slot, in series order
    pub fn column(&self, period_index: usize) -> Vec<(String, f64)> {
        self.entries
            .iter()
            .map(|(name, costs)| {
                (
                    name.clone(),
                    costs.get(period_index).copied().unwrap_or(0.0),
                )
            })
            .collect()
    }
}

/// Grand total per period, index-aligned with the series periods
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyTotals {
    pub periods: Vec<Period>,
    pub totals: Vec<f64>,
}

impl MonthlyTotals {
    pub fn get(&self, period: &Period) -> Option<f64> {
        self.periods
            .iter()
            .position(|p| p == period)
            .map(|i| self.totals[i])
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// One stacked bar segment series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub name: String,
    pub costs: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketedSeries {
    pub periods: Vec<Period>,
    pub top: Vec<Bucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub others: Option<Bucket>,
}

impl BucketedSeries {
    /// Top buckets followed by Others, the order they are stacked in
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.top.iter().chain(self.others.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.others.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRecord {
    pub name: String,
    pub previous: f64,
    pub current: f64,
    pub difference: f64,
    pub direction: ChangeDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRecord {
    /// Raw group key as the cost source reported it
    pub key: String,
    pub label: String,
    pub first: f64,
    pub second: f64,
    pub difference: f64,
    pub direction: ChangeDirection,
}

/// Headline row: totals of the trailing periods and the last month-over-month change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalComparison {
    pub periods: Vec<Period>,
    pub totals: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<ChangeDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BreakdownOutcome {
    Ok { records: Vec<BreakdownRecord> },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownTable {
    pub dimension: GroupingDimension,
    #[serde(flatten)]
    pub outcome: BreakdownOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceBreakdown {
    pub service: String,
    pub difference: f64,
    pub tables: Vec<BreakdownTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostReport {
    pub periods: Vec<Period>,
    pub chart: BucketedSeries,
    pub totals: TotalComparison,
    pub services: Vec<DiffRecord>,
    pub breakdowns: Vec<ServiceBreakdown>,
}
