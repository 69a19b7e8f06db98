use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use pl_ratings::config::{SinkConfig, WriteMode};
use pl_ratings::ingest::run_stats_ingest;
use pl_ratings::logging::init_logging;
use pl_ratings::sink::SqliteSink;
use pl_ratings::source::JsonDirSource;

#[derive(Parser)]
#[command(name = "stats_ingest")]
#[command(about = "Reshape extracted league stat tables and load them into the database", long_about = None)]
struct Cli {
    /// Directory holding stats_tables.json and scores_and_fixtures.json
    #[arg(long)]
    source_dir: PathBuf,

    /// SQLite file, overrides the configured database
    #[arg(long)]
    db: Option<PathBuf>,

    /// fail, replace or append
    #[arg(long)]
    mode: Option<WriteMode>,

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
    let mode = cli.mode.unwrap_or(config.write_mode);

    let source = JsonDirSource::new(&cli.source_dir);
    let mut sink = SqliteSink::open(&config)
        .with_context(|| format!("unable to open {}", config.database))?;
    let summary = run_stats_ingest(&source, &mut sink, mode)
        .with_context(|| format!("ingest from {} failed", source.dir().display()))?;

    println!("Stats ingest complete");
    println!("DB: {}", config.database);
    println!("Tables written: {}", summary.tables.len());
    for (name, rows) in &summary.tables {
        println!(" - {name}: {rows}");
    }
    println!("Rows written: {}", summary.rows_written);

    Ok(())
}
