use crate::helpers::compare_floats;
use crate::models::{Bucket, BucketedSeries, CostSeries};

pub const OTHERS_LABEL: &str = "Others";

/// Keep the `top_n` most expensive entities and fold the rest into "Others".
///
/// Ranking is by total across all periods, descending; ties keep series
/// order. Others is only emitted when at least one entity was folded in.
pub fn bucket_top_n(series: &CostSeries, top_n: usize) -> BucketedSeries {
    let mut ranked: Vec<(&str, &[f64], f64)> = series
        .iter()
        .map(|(name, costs)| (name, costs, costs.iter().sum::<f64>()))
        .collect();
    // sort_by is stable
    ranked.sort_by(|a, b| compare_floats(b.2, a.2));

    let split = top_n.min(ranked.len());
    let (kept, rest) = ranked.split_at(split);

    let top = kept
        .iter()
        .map(|(name, costs, _)| Bucket {
            name: name.to_string(),
            costs: costs.to_vec(),
        })
        .collect();

    let others = if rest.is_empty() {
        None
    } else {
        let mut costs = vec![0.0; series.period_count()];
        for (_, entity_costs, _) in rest {
            for (slot, value) in costs.iter_mut().zip(entity_costs.iter()) {
                *slot += value;
            }
        }
        Some(Bucket {
            name: OTHERS_LABEL.to_string(),
            costs,
        })
    };

    BucketedSeries {
        periods: series.periods().to_vec(),
        top,
        others,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Period;

    fn series(entries: &[(&str, [f64; 2])]) -> CostSeries {
        let periods = vec![
            Period::from_ymd(2024, 1).unwrap(),
            Period::from_ymd(2024, 2).unwrap(),
        ];
        let mut series = CostSeries::new(periods);
        for (name, costs) in entries {
            for (i, cost) in costs.iter().enumerate() {
                series.add(name, i, *cost);
            }
        }
        series
    }

    #[test]
    fn test_top_two_with_others() {
        let input = series(&[("C", [1.0, 1.0]), ("A", [10.0, 20.0]), ("B", [5.0, 5.0])]);
        let bucketed = bucket_top_n(&input, 2);

        let names: Vec<&str> = bucketed.top.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(bucketed.top[0].costs, vec![10.0, 20.0]);
        let others = bucketed.others.as_ref().unwrap();
        assert_eq!(others.name, "Others");
        assert_eq!(others.costs, vec![1.0, 1.0]);

        let mut per_period = [0.0, 0.0];
        for bucket in bucketed.buckets() {
            per_period[0] += bucket.costs[0];
            per_period[1] += bucket.costs[1];
        }
        assert_eq!(per_period, [16.0, 26.0]);
    }

    #[test]
    fn test_no_others_when_everything_fits() {
        let input = series(&[("A", [1.0, 2.0]), ("B", [0.0, 0.0])]);
        let bucketed = bucket_top_n(&input, 9);
        assert_eq!(bucketed.top.len(), 2);
        assert!(bucketed.others.is_none());

        let exact = bucket_top_n(&input, 2);
        assert!(exact.others.is_none());
    }

    #[test]
    fn test_ties_keep_accumulation_order() {
        let input = series(&[("first", [2.0, 1.0]), ("second", [1.0, 2.0]), ("third", [3.0, 0.0])]);
        let bucketed = bucket_top_n(&input, 2);
        let names: Vec<&str> = bucketed.top.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(bucketed.others.unwrap().costs, vec![3.0, 0.0]);
    }

    #[test]
    fn test_empty_series() {
        let bucketed = bucket_top_n(&CostSeries::default(), 9);
        assert!(bucketed.is_empty());
        assert!(bucketed.periods.is_empty());
    }

    #[test]
    fn test_zero_top_n_puts_everything_in_others() {
        let input = series(&[("A", [1.0, 2.0]), ("B", [3.0, 4.0])]);
        let bucketed = bucket_top_n(&input, 0);
        assert!(bucketed.top.is_empty());
        assert_eq!(bucketed.others.unwrap().costs, vec![4.0, 6.0]);
    }
}
