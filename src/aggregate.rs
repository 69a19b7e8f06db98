use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::categories::{Category, CategorySpec, MetricInput, MetricSpec, percentage};
use crate::error::{AggregateError, MissingMetricError};
use crate::ranking::PercentileRanker;

/// Raw metric values per team, in first-seen team order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetrics {
    teams: Vec<String>,
    values: Vec<HashMap<String, f64>>,
    index: HashMap<String, usize>,
}

impl RawMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, team: &str, metric: &str, value: f64) {
        let idx = self.team_slot(team);
        self.values[idx].insert(metric.to_string(), value);
    }

    /// Registers a team with no values yet.
    pub fn add_team(&mut self, team: &str) {
        self.team_slot(team);
    }

    pub fn with(mut self, team: &str, metrics: &[(&str, f64)]) -> Self {
        self.add_team(team);
        for (metric, value) in metrics {
            self.insert(team, metric, *value);
        }
        self
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn get(&self, team: &str, metric: &str) -> Option<f64> {
        let idx = *self.index.get(team)?;
        self.values[idx].get(metric).copied()
    }

    pub fn contains_team(&self, team: &str) -> bool {
        self.index.contains_key(team)
    }

    /// Teams present on both sides, in `self` order, with values from both.
    pub fn inner_join(&self, other: &RawMetrics) -> RawMetrics {
        let mut out = RawMetrics::new();
        for (team, values) in self.teams.iter().zip(&self.values) {
            let Some(other_idx) = other.index.get(team) else {
                continue;
            };
            out.add_team(team);
            for (metric, value) in values.iter().chain(other.values[*other_idx].iter()) {
                out.insert(team, metric, *value);
            }
        }
        out
    }

    fn team_slot(&mut self, team: &str) -> usize {
        if let Some(idx) = self.index.get(team) {
            return *idx;
        }
        let idx = self.teams.len();
        self.teams.push(team.to_string());
        self.values.push(HashMap::new());
        self.index.insert(team.to_string(), idx);
        idx
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub team: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryAggregator {
    ranker: PercentileRanker,
}

impl CategoryAggregator {
    pub fn new(ranker: PercentileRanker) -> Self {
        Self { ranker }
    }

    /// Normalize every declared metric and average them per team.
    ///
    /// Derived percentages are computed from raw counts before ranking. A
    /// metric missing for any team fails the whole category.
    pub fn compute_category(
        &self,
        raw_metrics: &RawMetrics,
        spec: &CategorySpec,
    ) -> Result<Vec<CategoryScore>, AggregateError> {
        if spec.metrics.is_empty() {
            return Err(AggregateError::EmptyCategory(spec.category));
        }

        let teams = raw_metrics.teams();
        let mut totals = vec![0.0_f64; teams.len()];

        for metric in &spec.metrics {
            let series = metric_series(raw_metrics, spec.category, metric)?;
            let scores = self
                .ranker
                .score(&series, metric.polarity, metric.range)
                .map_err(|source| AggregateError::Rank {
                    category: spec.category,
                    metric: metric.name.clone(),
                    source,
                })?;
            debug!(
                "{}: ranked {} ({:?}, {}..{}) for {} teams",
                spec.category,
                metric.name,
                metric.polarity,
                metric.range.min_pct,
                metric.range.max_pct,
                scores.len()
            );
            for (total, score) in totals.iter_mut().zip(scores) {
                *total += score;
            }
        }

        let n = spec.metrics.len() as f64;
        Ok(teams
            .iter()
            .zip(totals)
            .map(|(team, total)| CategoryScore {
                category: spec.category,
                team: team.clone(),
                value: total / n,
            })
            .collect())
    }
}

pub fn compute_category(
    raw_metrics: &RawMetrics,
    spec: &CategorySpec,
) -> Result<Vec<CategoryScore>, AggregateError> {
    CategoryAggregator::default().compute_category(raw_metrics, spec)
}

/// Raw values of one declared metric across all teams, deriving percentages
/// where the metric asks for them.
pub fn metric_series(
    raw_metrics: &RawMetrics,
    category: Category,
    metric: &MetricSpec,
) -> Result<Vec<f64>, MissingMetricError> {
    let missing = |team: &str| MissingMetricError {
        category,
        metric: metric.name.clone(),
        team: Some(team.to_string()),
    };

    raw_metrics
        .teams()
        .iter()
        .map(|team| match &metric.input {
            MetricInput::Column(column) => raw_metrics
                .get(team, column)
                .ok_or_else(|| missing(team)),
            MetricInput::Percentage {
                numerator,
                denominator,
            } => {
                let num = raw_metrics.get(team, numerator).ok_or_else(|| missing(team))?;
                let den = raw_metrics
                    .get(team, denominator)
                    .ok_or_else(|| missing(team))?;
                percentage(num, den).ok_or_else(|| missing(team))
            }
        })
        .collect()
}
