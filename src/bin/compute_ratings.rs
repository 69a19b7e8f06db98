use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use pl_ratings::config::SinkConfig;
use pl_ratings::logging::init_logging;
use pl_ratings::ranking::{DegeneratePolicy, PercentileRanker};
use pl_ratings::ratings::{RATINGS_TABLE, RatingPipeline};

#[derive(Parser)]
#[command(name = "compute_ratings")]
#[command(about = "Compute attack, midfield, defence and overall team ratings", long_about = None)]
struct Cli {
    /// SQLite file, overrides the configured database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Fail instead of scoring the midpoint when a metric has no spread
    #[arg(long)]
    strict: bool,

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

    let policy = if cli.strict {
        DegeneratePolicy::Reject
    } else {
        DegeneratePolicy::Midpoint
    };
    let pipeline = RatingPipeline::new(config).with_ranker(PercentileRanker::new(policy));
    let mut sink = pipeline
        .open_sink()
        .with_context(|| format!("unable to open {}", pipeline.config().database))?;
    let records = pipeline
        .compute_and_store(&mut sink)
        .context("rating computation failed")?;

    println!("Ratings written to {RATINGS_TABLE}: {} teams", records.len());
    for record in &records {
        println!(
            "{:<28} att {:>6.2}  mid {:>6.2}  def {:>6.2}  overall {:>6.2}",
            record.team, record.attack, record.midfield, record.defence, record.overall
        );
    }

    Ok(())
}
