use crate::accumulator::accumulate;
use crate::breakdown::join_breakdown;
use crate::bucketing::bucket_top_n;
use crate::config::Config;
use crate::cost_source::{CostQuery, CostSource};
use crate::diff::{diff_map, diff_totals};
use crate::domain::{ChangeDirection, GroupingDimension, ReportWindow};
use crate::error::Result;
use crate::models::{
    BreakdownOutcome, BreakdownRecord, BreakdownTable, CostReport, CostSeries, DiffRecord,
    MonthlyTotals, ServiceBreakdown, TotalComparison,
};
use crate::threshold::{SelectedEntity, Thresholds, last_two_periods, select_growing};
use futures::stream::{self, StreamExt};

/// Periods shown in the headline total row
const TOTAL_COMPARISON_PERIODS: usize = 3;

/// Services broken down at the same time; Cost Explorer throttles bursts
pub const MAX_CONCURRENT_BREAKDOWNS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub top_n: usize,
    pub thresholds: Thresholds,
    pub min_breakdown_cost: f64,
    pub min_service_cost: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ReportSettings {
    fn from(config: &Config) -> Self {
        Self {
            top_n: config.top_n,
            thresholds: config.thresholds(),
            min_breakdown_cost: config.min_breakdown_cost,
            min_service_cost: config.min_service_cost,
        }
    }
}

/// Totals of the trailing periods plus the change between the last two
pub fn total_comparison(totals: &MonthlyTotals) -> TotalComparison {
    let skip = totals.len().saturating_sub(TOTAL_COMPARISON_PERIODS);
    let periods = totals.periods[skip..].to_vec();
    let values = totals.totals[skip..].to_vec();

    let difference = match values.as_slice() {
        [.., previous, current] => Some(diff_totals(*previous, *current)),
        _ => None,
    };

    TotalComparison {
        periods,
        totals: values,
        difference,
        direction: difference.map(ChangeDirection::of),
    }
}

/// Per-service change between the last two periods, for services whose
/// current cost is at least `min_current_cost`, largest increase first
pub fn service_comparison(series: &CostSeries, min_current_cost: f64) -> Vec<DiffRecord> {
    let count = series.period_count();
    if count < 2 {
        return Vec::new();
    }
    let mut records = diff_map(&series.column(count - 2), &series.column(count - 1));
    records.retain(|record| record.current >= min_current_cost);
    records
}

/// Retrieve and join one secondary grouping for one service
pub async fn fetch_breakdown<S: CostSource + ?Sized>(
    source: &S,
    window: ReportWindow,
    service: &str,
    dimension: GroupingDimension,
    min_combined_cost: f64,
) -> Result<Vec<BreakdownRecord>> {
    let query = CostQuery::for_service(window.last_two(), dimension.group_key(), service);
    let responses = source.fetch(&query).await?;
    Ok(join_breakdown(
        dimension,
        &query.window.periods(),
        &responses,
        min_combined_cost,
    ))
}

async fn breakdown_for<S: CostSource + ?Sized>(
    source: &S,
    window: ReportWindow,
    selected: &SelectedEntity,
    min_combined_cost: f64,
) -> ServiceBreakdown {
    let mut tables = Vec::with_capacity(GroupingDimension::ALL.len());

    for dimension in GroupingDimension::ALL {
        let outcome =
            match fetch_breakdown(source, window, &selected.name, dimension, min_combined_cost)
                .await
            {
                Ok(records) => BreakdownOutcome::Ok { records },
                Err(err) => {
                    tracing::warn!(
                        service = %selected.name,
                        %dimension,
                        error = %err,
                        "breakdown failed, continuing without it"
                    );
                    BreakdownOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            };
        tables.push(BreakdownTable { dimension, outcome });
    }

    ServiceBreakdown {
        service: selected.name.clone(),
        difference: selected.difference,
        tables,
    }
}

/// Run the whole pipeline for one window.
///
/// Only the top level service retrieval can fail the report; a failed
/// breakdown is recorded in its table and the rest of the report still
/// completes.
pub async fn generate_cost_report<S: CostSource + ?Sized>(
    source: &S,
    window: ReportWindow,
    settings: &ReportSettings,
) -> Result<CostReport> {
    let responses = source.fetch(&CostQuery::by_service(window)).await?;
    let (series, totals) = accumulate(&window.periods(), &responses);
    tracing::info!(
        services = series.len(),
        periods = series.period_count(),
        "accumulated service costs"
    );

    let chart = bucket_top_n(&series, settings.top_n);
    let services = service_comparison(&series, settings.min_service_cost);
    let selected = select_growing(&last_two_periods(&series), &settings.thresholds);
    tracing::info!(selected = selected.len(), "services selected for breakdown");

    // buffered yields in request order, so the tables stay deterministic
    let breakdowns: Vec<ServiceBreakdown> = stream::iter(
        selected
            .iter()
            .map(|entity| breakdown_for(source, window, entity, settings.min_breakdown_cost)),
    )
    .buffered(MAX_CONCURRENT_BREAKDOWNS)
    .collect()
    .await;

    Ok(CostReport {
        periods: series.periods().to_vec(),
        chart,
        totals: total_comparison(&totals),
        services,
        breakdowns,
    })
}
