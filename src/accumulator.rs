use crate::domain::Period;
use crate::models::{CostSeries, MonthlyTotals, PeriodGroups};

/// Fold grouped line items into a per-entity cost series and per-period totals.
///
/// The series is laid out on `periods`, the months that were asked for, so a
/// month the source returned nothing for still gets a zero column. Responses
/// for any other month are dropped. An entity repeated within one period is
/// summed, and an entity missing from a period keeps 0 in that slot. Negative
/// amounts (credits) are accumulated as-is.
pub fn accumulate(periods: &[Period], responses: &[PeriodGroups]) -> (CostSeries, MonthlyTotals) {
    let mut series = CostSeries::new(periods.to_vec());
    let mut totals = vec![0.0; periods.len()];

    for response in responses {
        let Some(index) = periods.iter().position(|p| *p == response.period) else {
            tracing::warn!(period = %response.period, "ignoring costs outside the report window");
            continue;
        };
        for group in &response.groups {
            series.add(&group.key, index, group.amount);
            totals[index] += group.amount;
        }
    }

    (
        series,
        MonthlyTotals {
            periods: periods.to_vec(),
            totals,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CostGroup;

    fn month(m: u32) -> Period {
        Period::from_ymd(2024, m).unwrap()
    }

    fn window() -> Vec<Period> {
        vec![month(1), month(2), month(3)]
    }

    fn sample() -> Vec<PeriodGroups> {
        vec![
            PeriodGroups::new(
                month(1),
                vec![CostGroup::new("EC2", 100.0), CostGroup::new("S3", 10.0)],
            ),
            PeriodGroups::new(
                month(2),
                vec![
                    CostGroup::new("EC2", 120.0),
                    CostGroup::new("Lambda", 3.5),
                    CostGroup::new("EC2", 5.0),
                ],
            ),
            PeriodGroups::new(month(3), vec![CostGroup::new("Tax", -2.0)]),
        ]
    }

    #[test]
    fn test_every_vector_has_full_length() {
        let (series, totals) = accumulate(&window(), &sample());
        assert_eq!(series.period_count(), 3);
        assert_eq!(totals.len(), 3);
        for (_, costs) in series.iter() {
            assert_eq!(costs.len(), 3);
        }
        assert_eq!(series.get("S3"), Some(&[10.0, 0.0, 0.0][..]));
        assert_eq!(series.get("Lambda"), Some(&[0.0, 3.5, 0.0][..]));
    }

    #[test]
    fn test_repeated_entity_accumulates() {
        let (series, _) = accumulate(&window(), &sample());
        assert_eq!(series.get("EC2"), Some(&[100.0, 125.0, 0.0][..]));
    }

    #[test]
    fn test_totals_match_column_sums() {
        let (series, totals) = accumulate(&window(), &sample());
        for i in 0..series.period_count() {
            let column_sum: f64 = series.iter().map(|(_, costs)| costs[i]).sum();
            assert!((column_sum - totals.totals[i]).abs() < 1e-9);
        }
        assert_eq!(totals.get(&month(2)), Some(128.5));
        assert_eq!(totals.get(&month(3)), Some(-2.0));
    }

    #[test]
    fn test_periods_sorted_chronologically() {
        let mut responses = sample();
        responses.reverse();
        let (series, totals) = accumulate(&window(), &responses);
        assert_eq!(series.periods(), &[month(1), month(2), month(3)]);
        assert_eq!(totals.totals[0], 110.0);
    }

    #[test]
    fn test_empty_input() {
        let (series, totals) = accumulate(&[], &[]);
        assert!(series.is_empty());
        assert!(totals.is_empty());

        let (series, totals) = accumulate(&[month(1)], &[PeriodGroups::new(month(1), vec![])]);
        assert!(series.is_empty());
        assert_eq!(totals.totals, vec![0.0]);
    }

    #[test]
    fn test_missing_months_keep_zero_columns() {
        let periods = vec![month(1), month(2), month(3), month(4)];
        let responses = vec![
            PeriodGroups::new(month(1), vec![CostGroup::new("EC2", 10.0)]),
            PeriodGroups::new(month(3), vec![CostGroup::new("EC2", 30.0)]),
        ];
        let (series, totals) = accumulate(&periods, &responses);
        assert_eq!(series.periods(), &periods[..]);
        assert_eq!(series.get("EC2"), Some(&[10.0, 0.0, 30.0, 0.0][..]));
        assert_eq!(totals.totals, vec![10.0, 0.0, 30.0, 0.0]);
    }

    #[test]
    fn test_months_outside_window_dropped() {
        let responses = vec![
            PeriodGroups::new(month(5), vec![CostGroup::new("EC2", 99.0)]),
            PeriodGroups::new(month(2), vec![CostGroup::new("EC2", 20.0)]),
        ];
        let (series, totals) = accumulate(&window(), &responses);
        assert_eq!(series.get("EC2"), Some(&[0.0, 20.0, 0.0][..]));
        assert_eq!(totals.totals, vec![0.0, 20.0, 0.0]);
    }
}
