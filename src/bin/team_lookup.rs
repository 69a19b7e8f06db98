use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};

use pl_ratings::config::SinkConfig;
use pl_ratings::ingest::REGULAR_SEASON_TABLE;
use pl_ratings::logging::init_logging;
use pl_ratings::ratings::RATINGS_TABLE;
use pl_ratings::sink::SqliteSink;
use pl_ratings::table::{Cell, StatTable, TEAM_COLUMN_NORMALIZED};

#[derive(Clone, Copy, ValueEnum)]
enum LookupTable {
    Ratings,
    #[value(name = "regular_season")]
    RegularSeason,
}

impl LookupTable {
    fn name(self) -> &'static str {
        match self {
            LookupTable::Ratings => RATINGS_TABLE,
            LookupTable::RegularSeason => REGULAR_SEASON_TABLE,
        }
    }
}

#[derive(Parser)]
#[command(name = "team_lookup")]
#[command(about = "Print a team's stored rows as JSON", long_about = None)]
struct Cli {
    /// Team name, matched case-insensitively
    team: String,

    #[arg(long, value_enum, default_value = "ratings")]
    table: LookupTable,

    /// SQLite file, overrides the configured database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = SinkConfig::from_env().context("invalid database settings")?;
    if let Some(db) = &cli.db {
        config.database = db.display().to_string();
    }

    let sink = SqliteSink::open(&config)
        .with_context(|| format!("unable to open {}", config.database))?;
    let table = cli.table.name();
    let rows = sink
        .find_rows(table, TEAM_COLUMN_NORMALIZED, cli.team.trim())
        .with_context(|| format!("lookup in {table} failed"))?;
    if rows.is_empty() {
        bail!("no rows for `{}` in {table}", cli.team);
    }

    println!("{}", serde_json::to_string_pretty(&rows_to_json(&rows))?);
    Ok(())
}

fn rows_to_json(table: &StatTable) -> Vec<Value> {
    table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| (column.clone(), cell_to_json(cell)))
                .collect();
            Value::Object(object)
        })
        .collect()
}

fn cell_to_json(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Cell::Text(s) => Value::String(s.clone()),
    }
}
