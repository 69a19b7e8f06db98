use std::fs;
use std::path::PathBuf;

use pl_ratings::config::WriteMode;
use pl_ratings::error::{PipelineError, SourceError};
use pl_ratings::ingest::{
    REGULAR_SEASON_TABLE, SCORES_AND_FIXTURES_TABLE, run_stats_ingest, transform_extract,
};
use pl_ratings::sink::{SqliteSink, TableSink};
use pl_ratings::source::{
    Extract, FIXTURES_FILE, JsonDirSource, STATS_TABLES_FILE, StatCategory, TableSource,
};
use pl_ratings::table::{Cell, ColumnHeader, RawStatTable};

const TEAMS: [&str; 2] = ["Arsenal", "Brentford"];

fn league_overall() -> RawStatTable {
    RawStatTable::new(
        vec![
            ColumnHeader::single("Rk"),
            ColumnHeader::single("Squad"),
            ColumnHeader::single("MP"),
            ColumnHeader::single("Pts"),
        ],
        vec![
            vec![1.0.into(), TEAMS[0].into(), 38.0.into(), 89.0.into()],
            vec![2.0.into(), TEAMS[1].into(), 38.0.into(), 59.0.into()],
        ],
    )
}

fn league_home_away() -> RawStatTable {
    RawStatTable::new(
        vec![
            ColumnHeader::nested("Unnamed: 0_level_0", "Rk"),
            ColumnHeader::nested("Unnamed: 1_level_0", "Squad"),
            ColumnHeader::nested("Home", "Pts"),
            ColumnHeader::nested("Away", "Pts"),
        ],
        vec![
            vec![1.0.into(), TEAMS[0].into(), 47.0.into(), 42.0.into()],
            vec![2.0.into(), TEAMS[1].into(), 35.0.into(), 24.0.into()],
        ],
    )
}

fn category_table(opponent: bool, offset: f64) -> RawStatTable {
    let prefix = if opponent { "vs " } else { "" };
    RawStatTable::new(
        vec![
            ColumnHeader::nested("Unnamed: 0_level_0", "Squad"),
            ColumnHeader::nested("Unnamed: 1_level_0", "# Pl"),
            ColumnHeader::nested("Performance", "Gls"),
            ColumnHeader::nested("Performance", "G+A"),
        ],
        TEAMS
            .iter()
            .enumerate()
            .map(|(i, team)| {
                vec![
                    Cell::text(format!("{prefix}{team}")),
                    Cell::Number(20.0 + i as f64),
                    Cell::Number(offset + i as f64),
                    Cell::Number(offset * 2.0 + i as f64),
                ]
            })
            .collect(),
    )
}

fn fixtures() -> RawStatTable {
    RawStatTable::new(
        vec![
            ColumnHeader::single("Wk"),
            ColumnHeader::single("Date"),
            ColumnHeader::single("Home"),
            ColumnHeader::single("Score"),
            ColumnHeader::single("Away"),
        ],
        vec![
            vec![1.0.into(), "2024-08-17".into(), TEAMS[0].into(), "2–0".into(), TEAMS[1].into()],
            vec![20.0.into(), "2025-01-01".into(), TEAMS[1].into(), Cell::Null, TEAMS[0].into()],
        ],
    )
}

fn sample_extract() -> Extract {
    let mut stats_tables = vec![league_overall(), league_home_away()];
    for (i, _) in StatCategory::ALL.iter().enumerate() {
        stats_tables.push(category_table(false, 50.0 + i as f64));
        stats_tables.push(category_table(true, 30.0 + i as f64));
    }
    Extract {
        stats_tables,
        scores_and_fixtures: fixtures(),
    }
}

struct StaticSource(Extract);

impl TableSource for StaticSource {
    fn extract(&self) -> Result<Extract, SourceError> {
        Ok(self.0.clone())
    }
}

#[test]
fn transform_produces_tables_in_load_order() {
    let tables = transform_extract(&sample_extract()).unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names.len(), 13);
    assert_eq!(names[0], REGULAR_SEASON_TABLE);
    assert_eq!(names[4], StatCategory::Shooting.table_name());
    assert_eq!(names[12], SCORES_AND_FIXTURES_TABLE);

    let regular = &tables[0].table;
    assert_eq!(
        regular.columns,
        vec!["Rk", "Squad", "Overall_MP", "Overall_Pts", "Home_Pts", "Away_Pts"]
    );

    let standard = &tables[1].table;
    assert_eq!(standard.len(), 4);
    assert_eq!(standard.cell(0, "Squad"), Some(&Cell::text("Arsenal")));
    assert_eq!(standard.cell(0, "Value"), Some(&Cell::text("opponent")));
    assert_eq!(standard.cell(2, "Performance_Gls"), Some(&Cell::Number(50.0)));
}

#[test]
fn ingest_loads_every_table_and_records_the_run() {
    let mut sink = SqliteSink::in_memory().unwrap();
    let summary =
        run_stats_ingest(&StaticSource(sample_extract()), &mut sink, WriteMode::Replace).unwrap();
    assert_eq!(summary.tables.len(), 13);
    assert_eq!(summary.rows_written, 2 + 11 * 4 + 2);

    let shooting = sink
        .read_table("shooting_stats", &["squad", "performance_g_and_a", "value"])
        .unwrap();
    assert_eq!(shooting.len(), 4);
    assert_eq!(shooting.cell(3, "squad"), Some(&Cell::text("brentford")));
    assert_eq!(shooting.cell(3, "value"), Some(&Cell::text("squad")));

    let regular = sink.read_table(REGULAR_SEASON_TABLE, &[]).unwrap();
    assert!(regular.has_column("overall_pts"));
    assert!(regular.has_column("home_pts"));

    let fixtures = sink.read_table(SCORES_AND_FIXTURES_TABLE, &[]).unwrap();
    assert_eq!(fixtures.len(), 2);
    assert_eq!(fixtures.cell(1, "score"), Some(&Cell::Null));

    let runs = sink.runs().unwrap();
    assert_eq!(runs, vec![("stats_ingest".to_string(), 13, 48)]);

    // replacing on a rerun leaves the row counts unchanged
    run_stats_ingest(&StaticSource(sample_extract()), &mut sink, WriteMode::Replace).unwrap();
    assert_eq!(sink.read_table("shooting_stats", &[]).unwrap().len(), 4);
    assert_eq!(sink.runs().unwrap().len(), 2);
}

#[test]
fn fail_mode_stops_on_existing_table() {
    let mut sink = SqliteSink::in_memory().unwrap();
    let source = StaticSource(sample_extract());
    run_stats_ingest(&source, &mut sink, WriteMode::Fail).unwrap();
    let err = run_stats_ingest(&source, &mut sink, WriteMode::Fail).unwrap_err();
    assert!(matches!(err, PipelineError::Sink(_)));
    assert_eq!(sink.runs().unwrap().len(), 1);
}

#[test]
fn short_extract_is_rejected() {
    let mut extract = sample_extract();
    extract.stats_tables.truncate(5);
    let mut sink = SqliteSink::in_memory().unwrap();
    let err = run_stats_ingest(&StaticSource(extract), &mut sink, WriteMode::Replace).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Source(SourceError::MissingTables {
            expected: 24,
            found: 5
        })
    ));
    assert!(!sink.table_exists(REGULAR_SEASON_TABLE).unwrap());
}

#[test]
fn json_dir_source_reads_dumped_extract() {
    let mut dir = std::env::temp_dir();
    dir.push(format!("pl_ratings_ingest_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let extract = sample_extract();
    fs::write(
        dir.join(STATS_TABLES_FILE),
        serde_json::to_string(&extract.stats_tables).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.join(FIXTURES_FILE),
        serde_json::to_string(&extract.scores_and_fixtures).unwrap(),
    )
    .unwrap();

    let source = JsonDirSource::new(&dir);
    let loaded = source.extract().unwrap();
    assert_eq!(loaded.stats_tables.len(), Extract::expected_tables());
    assert_eq!(loaded.stats_tables[0], extract.stats_tables[0]);
    assert_eq!(loaded.scores_and_fixtures, extract.scores_and_fixtures);

    let missing = JsonDirSource::new(PathBuf::from(&dir).join("absent"));
    assert!(matches!(missing.extract(), Err(SourceError::Io { .. })));

    fs::remove_dir_all(&dir).ok();
}
