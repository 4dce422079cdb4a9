use crate::error::{CostLensError, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag key the cost-center breakdown groups by
pub const COST_CENTER_TAG: &str = "CostCenter";
/// Cost Explorer dimension the usage-type breakdown groups by
pub const USAGE_TYPE_DIMENSION: &str = "USAGE_TYPE";
/// Cost Explorer dimension for the top level service grouping
pub const SERVICE_DIMENSION: &str = "SERVICE";

// One monthly billing window, identified by the first day of the month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period(pub NaiveDate);

impl Period {
    pub fn from_ymd(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Period)
    }

    /// Parse either `YYYY-MM` or `YYYY-MM-DD`; the day is normalized to 1
    pub fn parse(input: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", input), "%Y-%m-%d"))
            .map_err(|_| CostLensError::date_parse_error(input, "YYYY-MM or YYYY-MM-DD"))?;
        Period::from_ymd(date.year(), date.month())
            .ok_or_else(|| CostLensError::date_parse_error(input, "YYYY-MM or YYYY-MM-DD"))
    }

    pub fn start(&self) -> NaiveDate {
        self.0
    }

    /// `None` past the last representable month
    pub fn next(&self) -> Option<Period> {
        self.0.checked_add_months(Months::new(1)).map(Period)
    }

    /// `2024-03-01`
    pub fn key(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// `March`
    pub fn label(&self) -> String {
        self.0.format("%B").to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

/// Half-open range of whole months `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: Period,
    pub end: Period,
}

impl ReportWindow {
    /// The `months` complete months before the month containing `today`
    pub fn ending_before(today: NaiveDate, months: u32) -> Result<Self> {
        let end = Period(today.with_day(1).unwrap_or(today));
        let start = end
            .0
            .checked_sub_months(Months::new(months))
            .map(Period)
            .ok_or_else(|| {
                CostLensError::config_error(&format!(
                    "a {} month window before {} is out of the supported date range",
                    months, end
                ))
            })?;
        Ok(Self { start, end })
    }

    pub fn periods(&self) -> Vec<Period> {
        let mut periods = Vec::new();
        let mut current = Some(self.start);
        while let Some(period) = current.filter(|p| *p < self.end) {
            periods.push(period);
            current = period.next();
        }
        periods
    }

    pub fn len(&self) -> usize {
        self.periods().len()
    }

    /// Window covering only the last two months, used for breakdowns
    pub fn last_two(&self) -> Self {
        let start = self
            .end
            .0
            .checked_sub_months(Months::new(2))
            .map_or(self.start, |start| Period(start).max(self.start));
        Self {
            start,
            end: self.end,
        }
    }
}

impl fmt::Display for ReportWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.key(), self.end.key())
    }
}

/// Secondary grouping applied within one service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupingDimension {
    CostCenter,
    UsageType,
}

impl GroupingDimension {
    pub const ALL: [GroupingDimension; 2] =
        [GroupingDimension::CostCenter, GroupingDimension::UsageType];

    pub fn group_key(&self) -> GroupKey {
        match self {
            GroupingDimension::CostCenter => GroupKey::Tag(COST_CENTER_TAG.to_string()),
            GroupingDimension::UsageType => GroupKey::Dimension(USAGE_TYPE_DIMENSION.to_string()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GroupingDimension::CostCenter => "CostCenter",
            GroupingDimension::UsageType => "UsageType",
        }
    }

    /// Human readable form of a raw group key returned for this dimension
    pub fn display_label(&self, raw_key: &str) -> String {
        match self {
            GroupingDimension::CostCenter => tag_value_label(COST_CENTER_TAG, raw_key),
            GroupingDimension::UsageType => raw_key.to_string(),
        }
    }
}

impl FromStr for GroupingDimension {
    type Err = CostLensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "costcenter" => Ok(GroupingDimension::CostCenter),
            "usagetype" => Ok(GroupingDimension::UsageType),
            _ => Err(CostLensError::invalid_grouping(s)),
        }
    }
}

impl fmt::Display for GroupingDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a cost source call groups by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Dimension(String),
    Tag(String),
}

impl GroupKey {
    pub fn service() -> Self {
        GroupKey::Dimension(SERVICE_DIMENSION.to_string())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Dimension(key) => write!(f, "DIMENSION:{}", key),
            GroupKey::Tag(key) => write!(f, "TAG:{}", key),
        }
    }
}

/// Tag group keys come back as `Key$value`; an untagged resource is `Key$`
pub fn tag_value_label(tag_key: &str, raw_key: &str) -> String {
    match raw_key.strip_prefix(tag_key).and_then(|rest| rest.strip_prefix('$')) {
        Some("") => format!("No tag key: {}", tag_key),
        Some(value) => value.to_string(),
        None => raw_key.to_string(),
    }
}

/// Sign of a difference, as plain data for the sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Increase,
    Decrease,
    Unchanged,
}

impl ChangeDirection {
    pub fn of(difference: f64) -> Self {
        if difference > 0.0 {
            ChangeDirection::Increase
        } else if difference < 0.0 {
            ChangeDirection::Decrease
        } else {
            ChangeDirection::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse() {
        let period = Period::parse("2024-03").unwrap();
        assert_eq!(period.key(), "2024-03-01");
        assert_eq!(period.label(), "March");

        let period = Period::parse("2024-03-17").unwrap();
        assert_eq!(period.key(), "2024-03-01");

        assert!(Period::parse("2024-13").is_err());
        assert!(Period::parse("march").is_err());
    }

    #[test]
    fn test_window_ending_before() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let window = ReportWindow::ending_before(today, 3).unwrap();
        assert_eq!(window.start.key(), "2023-12-01");
        assert_eq!(window.end.key(), "2024-03-01");

        let keys: Vec<String> = window.periods().iter().map(Period::key).collect();
        assert_eq!(keys, vec!["2023-12-01", "2024-01-01", "2024-02-01"]);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_window_out_of_range_is_an_error() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let err = ReportWindow::ending_before(today, u32::MAX).unwrap_err();
        assert!(matches!(err, CostLensError::Config { .. }));

        let window = ReportWindow::ending_before(today, 12 * 100).unwrap();
        assert_eq!(window.start.key(), "1924-04-01");
        assert_eq!(window.len(), 1200);
    }

    #[test]
    fn test_window_at_end_of_calendar() {
        let last = Period(NaiveDate::MAX.with_day(1).unwrap());
        assert_eq!(last.next(), None);

        let window = ReportWindow {
            start: last,
            end: last,
        };
        assert!(window.periods().is_empty());
    }

    #[test]
    fn test_window_last_two() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let window = ReportWindow::ending_before(today, 3).unwrap().last_two();
        assert_eq!(window.start.key(), "2024-01-01");
        assert_eq!(window.len(), 2);

        let single = ReportWindow::ending_before(today, 1).unwrap().last_two();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_grouping_dimension_from_str() {
        assert_eq!(
            "CostCenter".parse::<GroupingDimension>().unwrap(),
            GroupingDimension::CostCenter
        );
        assert_eq!(
            "usage-type".parse::<GroupingDimension>().unwrap(),
            GroupingDimension::UsageType
        );
        let err = "Region".parse::<GroupingDimension>().unwrap_err();
        assert!(matches!(err, CostLensError::InvalidGrouping { .. }));
    }

    #[test]
    fn test_group_keys() {
        assert_eq!(
            GroupingDimension::CostCenter.group_key(),
            GroupKey::Tag("CostCenter".to_string())
        );
        assert_eq!(
            GroupingDimension::UsageType.group_key(),
            GroupKey::Dimension("USAGE_TYPE".to_string())
        );
    }

    #[test]
    fn test_cost_center_labels() {
        let dim = GroupingDimension::CostCenter;
        assert_eq!(dim.display_label("CostCenter$"), "No tag key: CostCenter");
        assert_eq!(dim.display_label("CostCenter$platform"), "platform");
        assert_eq!(dim.display_label("prod"), "prod");
        assert_eq!(
            GroupingDimension::UsageType.display_label("CostCenter$"),
            "CostCenter$"
        );
    }

    #[test]
    fn test_change_direction() {
        assert_eq!(ChangeDirection::of(1.5), ChangeDirection::Increase);
        assert_eq!(ChangeDirection::of(-0.1), ChangeDirection::Decrease);
        assert_eq!(ChangeDirection::of(0.0), ChangeDirection::Unchanged);
    }
}
