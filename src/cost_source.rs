//! Where billing data comes from.
//!
//! The report pipeline only sees [`CostSource`]. The AWS Cost Explorer client
//! is built once by the caller and handed in, so tests and `--input` replays
//! can swap in a [`StaticCostSource`].

use crate::domain::{GroupKey, Period, ReportWindow};
use crate::error::{CostLensError, Result};
use crate::models::{CostGroup, PeriodGroups};
use async_trait::async_trait;
use aws_sdk_costexplorer::Client;
use aws_sdk_costexplorer::types::{
    DateInterval, Dimension, DimensionValues, Expression, Granularity, GroupDefinition,
    GroupDefinitionType,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Cost metric requested from Cost Explorer
pub const COST_METRIC: &str = "UnblendedCost";

/// One monthly, single group-by retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostQuery {
    pub window: ReportWindow,
    pub group_by: GroupKey,
    /// Restrict to a single service
    pub service: Option<String>,
}

impl CostQuery {
    pub fn by_service(window: ReportWindow) -> Self {
        Self {
            window,
            group_by: GroupKey::service(),
            service: None,
        }
    }

    pub fn for_service(window: ReportWindow, group_by: GroupKey, service: &str) -> Self {
        Self {
            window,
            group_by,
            service: Some(service.to_string()),
        }
    }
}

impl fmt::Display for CostQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.group_by, self.window)?;
        if let Some(service) = &self.service {
            write!(f, " [{}]", service)?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait CostSource: Send + Sync {
    /// Grouped amounts for every month in the query window, in calendar order
    async fn fetch(&self, query: &CostQuery) -> Result<Vec<PeriodGroups>>;
}

#[async_trait]
impl<S: CostSource + ?Sized> CostSource for Box<S> {
    async fn fetch(&self, query: &CostQuery) -> Result<Vec<PeriodGroups>> {
        (**self).fetch(query).await
    }
}

/// AWS Cost Explorer backed source
pub struct AwsCostExplorer {
    client: Client,
}

impl AwsCostExplorer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS credential chain
    pub async fn from_env(region: Option<&str>, profile: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;
        Self::new(Client::new(&config))
    }

    fn group_definition(group_by: &GroupKey) -> GroupDefinition {
        let (kind, key) = match group_by {
            GroupKey::Dimension(key) => (GroupDefinitionType::Dimension, key),
            GroupKey::Tag(key) => (GroupDefinitionType::Tag, key),
        };
        GroupDefinition::builder().r#type(kind).key(key).build()
    }
}

#[async_trait]
impl CostSource for AwsCostExplorer {
    async fn fetch(&self, query: &CostQuery) -> Result<Vec<PeriodGroups>> {
        let described = query.to_string();
        tracing::info!(query = %described, "fetching costs from AWS Cost Explorer");

        let interval = DateInterval::builder()
            .start(query.window.start.key())
            .end(query.window.end.key())
            .build()
            .map_err(|e| CostLensError::source_unavailable(&described, e))?;

        let filter = query.service.as_ref().map(|service| {
            Expression::builder()
                .dimensions(
                    DimensionValues::builder()
                        .key(Dimension::Service)
                        .values(service)
                        .build(),
                )
                .build()
        });

        let mut periods: Vec<PeriodGroups> = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let response = self
                .client
                .get_cost_and_usage()
                .time_period(interval.clone())
                .granularity(Granularity::Monthly)
                .metrics(COST_METRIC)
                .group_by(Self::group_definition(&query.group_by))
                .set_filter(filter.clone())
                .set_next_page_token(next_page_token.take())
                .send()
                .await
                .map_err(|e| CostLensError::source_unavailable(&described, e))?;

            for result in response.results_by_time() {
                let Some(start) = result.time_period().map(|tp| tp.start()) else {
                    continue;
                };
                let period = Period::parse(start)?;

                let groups = result.groups().iter().filter_map(|group| {
                    let key = group.keys().first()?.to_string();
                    let amount = group
                        .metrics()
                        .and_then(|metrics| metrics.get(COST_METRIC))
                        .and_then(|metric| metric.amount())?;
                    match amount.parse::<f64>() {
                        Ok(amount) => Some(CostGroup::new(key, amount)),
                        Err(_) => {
                            tracing::warn!(key = %key, amount, "skipping unparsable amount");
                            None
                        }
                    }
                });

                match periods.iter_mut().find(|p| p.period == period) {
                    Some(existing) => existing.groups.extend(groups),
                    None => periods.push(PeriodGroups::new(period, groups.collect())),
                }
            }

            next_page_token = response.next_page_token().map(str::to_string);
            if next_page_token.is_none() {
                break;
            }
        }

        periods.sort_by_key(|p| p.period);
        tracing::info!(
            query = %described,
            periods = periods.len(),
            groups = periods.iter().map(|p| p.groups.len()).sum::<usize>(),
            "fetched costs"
        );
        Ok(periods)
    }
}

/// One canned answer of a [`StaticCostSource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticEntry {
    pub group_by: GroupKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub responses: Vec<PeriodGroups>,
}

/// In-memory source answering from previously captured responses.
///
/// Only the periods inside the query window are returned. A query with no
/// matching entry fails like an unreachable source would.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticCostSource {
    pub entries: Vec<StaticEntry>,
}

impl StaticCostSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        group_by: GroupKey,
        service: Option<&str>,
        responses: Vec<PeriodGroups>,
    ) -> Self {
        self.entries.push(StaticEntry {
            group_by,
            service: service.map(str::to_string),
            responses,
        });
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[async_trait]
impl CostSource for StaticCostSource {
    async fn fetch(&self, query: &CostQuery) -> Result<Vec<PeriodGroups>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.group_by == query.group_by && e.service == query.service)
            .ok_or_else(|| CostLensError::source_unavailable(&query.to_string(), "no data"))?;

        let mut responses: Vec<PeriodGroups> = entry
            .responses
            .iter()
            .filter(|r| r.period >= query.window.start && r.period < query.window.end)
            .cloned()
            .collect();
        responses.sort_by_key(|r| r.period);
        Ok(responses)
    }
}

/// Wraps another source and keeps every successful answer, so a run can be
/// replayed later through [`StaticCostSource`]
pub struct RecordingCostSource<S> {
    inner: S,
    recorded: Mutex<StaticCostSource>,
}

impl<S: CostSource> RecordingCostSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            recorded: Mutex::new(StaticCostSource::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StaticCostSource> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn recorded(&self) -> StaticCostSource {
        self.lock().clone()
    }
}

#[async_trait]
impl<S: CostSource> CostSource for RecordingCostSource<S> {
    async fn fetch(&self, query: &CostQuery) -> Result<Vec<PeriodGroups>> {
        let responses = self.inner.fetch(query).await?;
        self.lock().entries.push(StaticEntry {
            group_by: query.group_by.clone(),
            service: query.service.clone(),
            responses: responses.clone(),
        });
        Ok(responses)
    }
}
