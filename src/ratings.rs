use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::aggregate::{CategoryAggregator, CategoryScore, RawMetrics};
use crate::categories::CategorySpec;
use crate::config::{SinkConfig, WriteMode};
use crate::error::{MissingMetricError, PipelineError, SinkError};
use crate::ranking::PercentileRanker;
use crate::sink::{SqliteSink, TableSink};
use crate::table::{
    Cell, PERSPECTIVE_COLUMN_NORMALIZED, Perspective, StatTable, TEAM_COLUMN_NORMALIZED,
};

pub const RATINGS_TABLE: &str = "ratings";
pub const RATINGS_COLUMNS: [&str; 5] = ["squad", "attack", "midfield", "defence", "overall"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub team: String,
    pub attack: f64,
    pub midfield: f64,
    pub defence: f64,
    pub overall: f64,
}

impl RatingRecord {
    pub fn new(team: &str, attack: f64, midfield: f64, defence: f64) -> Self {
        Self {
            team: team.to_string(),
            attack,
            midfield,
            defence,
            overall: (attack + midfield + defence) / 3.0,
        }
    }

    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::text(self.team.as_str()),
            Cell::Number(self.attack),
            Cell::Number(self.midfield),
            Cell::Number(self.defence),
            Cell::Number(self.overall),
        ]
    }
}

pub fn ratings_table(records: &[RatingRecord]) -> StatTable {
    StatTable::new(
        RATINGS_COLUMNS.iter().map(|c| c.to_string()).collect(),
        records.iter().map(RatingRecord::to_row).collect(),
    )
}

/// Inner-join three category score sets on team identity. A team missing
/// from any set is dropped. Output is sorted by team.
pub fn merge_categories(
    attack: &[CategoryScore],
    midfield: &[CategoryScore],
    defence: &[CategoryScore],
) -> Vec<RatingRecord> {
    let by_team = |scores: &[CategoryScore]| -> HashMap<String, f64> {
        scores.iter().map(|s| (s.team.clone(), s.value)).collect()
    };
    let midfield = by_team(midfield);
    let defence = by_team(defence);

    let mut out: Vec<RatingRecord> = attack
        .iter()
        .filter_map(|a| {
            let (Some(m), Some(d)) = (midfield.get(&a.team), defence.get(&a.team)) else {
                debug!("{} lacks a full set of category scores; dropped", a.team);
                return None;
            };
            Some(RatingRecord::new(&a.team, a.value, *m, *d))
        })
        .collect();
    out.sort_by(|a, b| a.team.cmp(&b.team));
    out
}

pub struct RatingPipeline {
    config: SinkConfig,
    aggregator: CategoryAggregator,
    attack: CategorySpec,
    midfield: CategorySpec,
    defence: CategorySpec,
}

impl RatingPipeline {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            aggregator: CategoryAggregator::default(),
            attack: CategorySpec::attack(),
            midfield: CategorySpec::midfield(),
            defence: CategorySpec::defence(),
        }
    }

    pub fn with_ranker(mut self, ranker: PercentileRanker) -> Self {
        self.aggregator = CategoryAggregator::new(ranker);
        self
    }

    pub fn with_specs(
        mut self,
        attack: CategorySpec,
        midfield: CategorySpec,
        defence: CategorySpec,
    ) -> Self {
        self.attack = attack;
        self.midfield = midfield;
        self.defence = defence;
        self
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Open the SQLite sink the pipeline is configured for.
    pub fn open_sink(&self) -> Result<SqliteSink, SinkError> {
        SqliteSink::open(&self.config)
    }

    /// Score each category independently, then join and average them.
    pub fn run(
        &self,
        attack_metrics: &RawMetrics,
        midfield_metrics: &RawMetrics,
        defence_metrics: &RawMetrics,
    ) -> Result<Vec<RatingRecord>, PipelineError> {
        let attack = self.aggregator.compute_category(attack_metrics, &self.attack)?;
        let midfield = self
            .aggregator
            .compute_category(midfield_metrics, &self.midfield)?;
        let defence = self
            .aggregator
            .compute_category(defence_metrics, &self.defence)?;
        Ok(merge_categories(&attack, &midfield, &defence))
    }

    /// Read the raw metrics back from the sink, compute ratings and replace the
    /// ratings table.
    pub fn compute_and_store(
        &self,
        sink: &mut impl TableSink,
    ) -> Result<Vec<RatingRecord>, PipelineError> {
        info!("Getting Attack Data and Calculating Ratings...");
        let attack = load_category_metrics(&*sink, &self.attack)?;
        info!("Getting Midfield Data and Calculating Ratings...");
        let midfield = load_category_metrics(&*sink, &self.midfield)?;
        info!("Getting Defence Data and Calculating Ratings...");
        let defence = load_category_metrics(&*sink, &self.defence)?;

        let records = self.run(&attack, &midfield, &defence)?;
        if records.is_empty() {
            warn!("no team has scores in every category");
        }
        sink.write_table(RATINGS_TABLE, &ratings_table(&records), WriteMode::Replace)?;
        info!("Rating Successfully Loaded....");
        Ok(records)
    }
}

/// Squad-perspective raw columns a category needs, inner-joined across its
/// source tables on team identity.
pub fn load_category_metrics(
    sink: &impl TableSink,
    spec: &CategorySpec,
) -> Result<RawMetrics, PipelineError> {
    let mut merged: Option<RawMetrics> = None;

    for table_name in spec.source_tables() {
        let table = sink.read_table(table_name, &[])?;
        let columns = spec.raw_columns_for(table_name);
        let part = squad_metrics(&table, &columns).map_err(|err| match err {
            SquadReadError::MissingColumn(column) => PipelineError::from(MissingMetricError {
                category: spec.category,
                metric: column,
                team: None,
            }),
            SquadReadError::DuplicateTeam(team) => PipelineError::DuplicateRow {
                table: table_name.to_string(),
                team,
            },
        })?;
        debug!(
            "{}: {} squad rows from {}",
            spec.category,
            part.len(),
            table_name
        );
        merged = Some(match merged {
            None => part,
            Some(prev) => prev.inner_join(&part),
        });
    }

    Ok(merged.unwrap_or_default())
}

enum SquadReadError {
    MissingColumn(String),
    DuplicateTeam(String),
}

/// One entry per squad row. A team seen twice is an error rather than a
/// silent overwrite.
fn squad_metrics(table: &StatTable, columns: &[&str]) -> Result<RawMetrics, SquadReadError> {
    let index_of = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| SquadReadError::MissingColumn(name.to_string()))
    };
    let team_idx = index_of(TEAM_COLUMN_NORMALIZED)?;
    let perspective_idx = index_of(PERSPECTIVE_COLUMN_NORMALIZED)?;
    let mut metric_idx = Vec::with_capacity(columns.len());
    for column in columns {
        metric_idx.push((*column, index_of(*column)?));
    }

    let mut out = RawMetrics::new();
    for row in &table.rows {
        if row[perspective_idx].as_str() != Some(Perspective::Squad.as_str()) {
            continue;
        }
        let Some(team) = row[team_idx].as_str() else {
            continue;
        };
        if out.contains_team(team) {
            return Err(SquadReadError::DuplicateTeam(team.to_string()));
        }
        out.add_team(team);
        for (column, idx) in &metric_idx {
            if let Some(value) = row[*idx].as_f64() {
                out.insert(team, column, value);
            }
        }
    }
    Ok(out)
}
