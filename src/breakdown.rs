use crate::diff::reconcile;
use crate::domain::{ChangeDirection, GroupingDimension, Period};
use crate::helpers::compare_floats;
use crate::models::{BreakdownRecord, CostGroup, PeriodGroups};

/// Every group reported for `period`, across however many responses carry it
fn groups_for<'a>(responses: &'a [PeriodGroups], period: Option<&Period>) -> Vec<&'a CostGroup> {
    match period {
        Some(period) => responses
            .iter()
            .filter(|response| response.period == *period)
            .flat_map(|response| response.groups.iter())
            .collect(),
        None => Vec::new(),
    }
}

/// Join the two periods of a secondary grouping for one service.
///
/// The first and second costs belong to the last two entries of `periods`,
/// matched against each response by date; a period with no response counts
/// as no spend at all. Sub-keys from either period are kept when their
/// combined cost is at least `min_combined_cost`, and the result is ordered
/// by second-period cost, highest first.
pub fn join_breakdown(
    dimension: GroupingDimension,
    periods: &[Period],
    responses: &[PeriodGroups],
    min_combined_cost: f64,
) -> Vec<BreakdownRecord> {
    let (first_period, second_period) = match periods {
        [] => return Vec::new(),
        [only] => (None, Some(only)),
        [.., previous, current] => (Some(previous), Some(current)),
    };
    let first = groups_for(responses, first_period);
    let second = groups_for(responses, second_period);

    let mut records: Vec<BreakdownRecord> = reconcile(
        &first,
        &second,
        |group| group.key.as_str(),
        |group| group.amount,
    )
    .into_iter()
    .filter(|pair| pair.combined() >= min_combined_cost)
    .map(|pair| {
        let difference = pair.difference();
        BreakdownRecord {
            label: dimension.display_label(&pair.key),
            key: pair.key,
            first: pair.first,
            second: pair.second,
            difference,
            direction: ChangeDirection::of(difference),
        }
    })
    .collect();

    records.sort_by(|a, b| compare_floats(b.second, a.second));
    records
}
