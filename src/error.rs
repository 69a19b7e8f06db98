use std::path::PathBuf;

use thiserror::Error;

use crate::categories::Category;

#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error("column {index} has an empty header")]
    EmptyHeader { index: usize },

    #[error("duplicate column `{0}` after flattening")]
    DuplicateColumn(String),

    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("missing column `{0}`")]
    MissingColumn(String),

    #[error("join key ({key}) is not unique in the {side} table")]
    DuplicateKey { side: &'static str, key: String },
}

#[derive(Debug, Error)]
pub enum CombineError {
    #[error("unable to flatten the {side} table")]
    Flatten {
        side: &'static str,
        #[source]
        source: ReshapeError,
    },

    #[error("the {side} table has no `{column}` column")]
    MissingTeamColumn {
        side: &'static str,
        column: &'static str,
    },

    #[error("squad and opponent tables have different columns ({squad} vs {opponent})")]
    ColumnMismatch { squad: usize, opponent: usize },

    #[error("team `{team}` appears more than once in the {side} table")]
    DuplicateTeam { side: &'static str, team: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum RankDegenerateError {
    #[error("value at position {index} is not finite ({value})")]
    NonFinite { index: usize, value: f64 },

    #[error("all {len} values are equal; ranks have no spread")]
    AllEqual { len: usize },
}

#[derive(Debug, Error, PartialEq)]
#[error("{category}: metric `{metric}` is unavailable for {}", .team.as_deref().unwrap_or("every team"))]
pub struct MissingMetricError {
    pub category: Category,
    pub metric: String,
    pub team: Option<String>,
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    MissingMetric(#[from] MissingMetricError),

    #[error("{category}: unable to rank `{metric}`")]
    Rank {
        category: Category,
        metric: String,
        #[source]
        source: RankDegenerateError,
    },

    #[error("{0} declares no metrics")]
    EmptyCategory(Category),
}

#[derive(Debug, Error)]
#[error("transaction on `{table}` failed and was rolled back")]
pub struct SinkTransactionError {
    pub table: String,
    #[source]
    pub source: rusqlite::Error,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("unable to open database {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("table `{0}` already exists")]
    TableExists(String),

    #[error("table `{0}` does not exist")]
    UnknownTable(String),

    #[error(transparent)]
    Transaction(#[from] SinkTransactionError),

    #[error("unable to read `{table}`")]
    Read {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port `{0}`")]
    InvalidPort(String),

    #[error("invalid write mode `{0}` (expected fail, replace or append)")]
    InvalidWriteMode(String),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unable to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid table json in {}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected at least {expected} extracted tables, found {found}")]
    MissingTables { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unable to reshape `{table}`")]
    Reshape {
        table: String,
        #[source]
        source: ReshapeError,
    },

    #[error("unable to combine `{table}`")]
    Combine {
        table: String,
        #[source]
        source: CombineError,
    },

    #[error("`{table}` holds more than one squad row for `{team}`")]
    DuplicateRow { table: String, team: String },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<MissingMetricError> for PipelineError {
    fn from(err: MissingMetricError) -> Self {
        PipelineError::Aggregate(AggregateError::MissingMetric(err))
    }
}
