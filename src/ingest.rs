use chrono::Utc;
use log::info;

use crate::config::WriteMode;
use crate::error::PipelineError;
use crate::reshape::{combine_squad_opponent, flatten, merge_regular_season};
use crate::sink::{RunRecord, TableSink};
use crate::source::{Extract, StatCategory, TableSource};
use crate::table::StatTable;

pub const REGULAR_SEASON_TABLE: &str = "regular_season";
pub const SCORES_AND_FIXTURES_TABLE: &str = "scores_and_fixtures";

const JOB_NAME: &str = "stats_ingest";

#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub table: StatTable,
}

#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub tables: Vec<(String, usize)>,
    pub rows_written: usize,
}

/// Reshape every extracted table into its canonical long form, in load order:
/// regular season, the eleven stat categories, then fixtures.
pub fn transform_extract(extract: &Extract) -> Result<Vec<NamedTable>, PipelineError> {
    extract.validate()?;

    let mut out = Vec::with_capacity(StatCategory::ALL.len() + 2);

    info!("Regular Season Transformations....");
    let regular_season = merge_regular_season(extract.league_overall(), extract.league_home_away())
        .map_err(|source| PipelineError::Reshape {
            table: REGULAR_SEASON_TABLE.to_string(),
            source,
        })?;
    out.push(NamedTable {
        name: REGULAR_SEASON_TABLE.to_string(),
        table: regular_season,
    });

    for category in StatCategory::ALL {
        info!("{} Transformations....", category.label());
        let (squad, opponent) = extract.pair(category);
        let table = combine_squad_opponent(squad, opponent).map_err(|source| {
            PipelineError::Combine {
                table: category.table_name().to_string(),
                source,
            }
        })?;
        out.push(NamedTable {
            name: category.table_name().to_string(),
            table,
        });
    }

    let fixtures = flatten(&extract.scores_and_fixtures).map_err(|source| PipelineError::Reshape {
        table: SCORES_AND_FIXTURES_TABLE.to_string(),
        source,
    })?;
    out.push(NamedTable {
        name: SCORES_AND_FIXTURES_TABLE.to_string(),
        table: fixtures,
    });

    Ok(out)
}

/// Extract, reshape and load every stats table. Each table is its own
/// transaction; the run stops at the first failure, leaving tables already
/// committed in place.
pub fn run_stats_ingest(
    source: &impl TableSource,
    sink: &mut impl TableSink,
    mode: WriteMode,
) -> Result<IngestSummary, PipelineError> {
    let started_at = Utc::now();

    info!("Data Extract Phase Started....");
    let extract = source.extract()?;
    info!("Data Extract Phase Ended....");

    info!("Data Transformation Phase Started....");
    let tables = transform_extract(&extract)?;
    info!("Data Transformation Phase Ended....");

    info!("Data Loading Phase Started....");
    let mut summary = IngestSummary::default();
    for named in &tables {
        let rows = sink.write_table(&named.name, &named.table, mode)?;
        summary.rows_written += rows;
        summary.tables.push((named.name.clone(), rows));
    }
    info!("Data Loading Phase Ended....");

    sink.record_run(&RunRecord {
        job: JOB_NAME.to_string(),
        started_at,
        finished_at: Utc::now(),
        tables_written: summary.tables.len(),
        rows_written: summary.rows_written,
    })?;

    Ok(summary)
}
