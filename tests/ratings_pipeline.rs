use pl_ratings::aggregate::{CategoryScore, RawMetrics, compute_category};
use pl_ratings::categories::{
    Category, CategorySpec, DEFENSIVE_ACTION_STATS, GOALKEEPING_STATS, MetricSpec, PASSING_STATS,
    PASSING_TYPES_STATS, SHOOTING_STATS, STANDARD_STATS, TACKLES_WIN_PCT, tackle_win_pct,
};
use pl_ratings::config::{SinkConfig, WriteMode};
use pl_ratings::error::{AggregateError, PipelineError};
use pl_ratings::ranking::{Polarity, RankRange};
use pl_ratings::ratings::{
    RATINGS_TABLE, RatingPipeline, RatingRecord, load_category_metrics, merge_categories,
    ratings_table,
};
use pl_ratings::sink::{SqliteSink, TableSink};
use pl_ratings::table::{Cell, StatTable};

const EPS: f64 = 1e-9;

fn attack_metrics() -> RawMetrics {
    RawMetrics::new()
        .with("A", &[("standard_gls", 3.0), ("standard_sot", 30.0), ("poss", 60.0)])
        .with("B", &[("standard_gls", 1.0), ("standard_sot", 10.0), ("poss", 40.0)])
        .with("C", &[("standard_gls", 2.0), ("standard_sot", 20.0), ("poss", 50.0)])
}

fn midfield_metrics() -> RawMetrics {
    let row = |crs: f64, ast: f64, off: f64, blocks: f64| {
        [
            ("passtypes_crs", crs),
            ("ast", ast),
            ("kp", 5.0),
            ("outcomes_off", off),
            ("outcomes_blocks", blocks),
        ]
    };
    RawMetrics::new()
        .with("A", &row(10.0, 30.0, 1.0, 3.0))
        .with("B", &row(20.0, 20.0, 2.0, 2.0))
        .with("C", &row(30.0, 10.0, 3.0, 1.0))
}

fn defence_metrics() -> RawMetrics {
    let row = |won: f64, attempted: f64, int: f64, ga: f64, sota: f64| {
        [
            ("tackles_tklw", won),
            ("tackles_tkl", attempted),
            ("int", int),
            ("performance_ga", ga),
            ("performance_sota", sota),
        ]
    };
    RawMetrics::new()
        .with("A", &row(10.0, 20.0, 10.0, 30.0, 100.0))
        .with("B", &row(12.0, 20.0, 5.0, 60.0, 150.0))
        .with("C", &row(7.0, 20.0, 15.0, 45.0, 120.0))
}

fn expected() -> Vec<RatingRecord> {
    vec![
        RatingRecord::new("A", 100.0, 69.0, 85.0),
        RatingRecord::new("B", 40.0, 69.0, 52.5),
        RatingRecord::new("C", 70.0, 69.0, 68.75),
    ]
}

fn assert_records(actual: &[RatingRecord], expected: &[RatingRecord]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert_eq!(a.team.to_lowercase(), e.team.to_lowercase());
        for (x, y) in [
            (a.attack, e.attack),
            (a.midfield, e.midfield),
            (a.defence, e.defence),
            (a.overall, e.overall),
        ] {
            assert!((x - y).abs() < EPS, "{a:?} vs {e:?}");
        }
    }
}

#[test]
fn tackle_win_pct_is_share_of_attempts() {
    assert_eq!(tackle_win_pct(10.0, 20.0), Some(50.0));
    assert_eq!(tackle_win_pct(0.0, 0.0), None);
}

#[test]
fn category_scores_average_normalized_metrics() {
    let scores = compute_category(&defence_metrics(), &CategorySpec::defence()).unwrap();
    let values: Vec<(String, f64)> = scores.into_iter().map(|s| (s.team, s.value)).collect();
    assert_eq!(values[0].0, "A");
    assert!((values[0].1 - 85.0).abs() < EPS);
    assert!((values[1].1 - 52.5).abs() < EPS);
    assert!((values[2].1 - 68.75).abs() < EPS);
}

#[test]
fn pipeline_scores_every_category() {
    let pipeline = RatingPipeline::new(SinkConfig::default());
    let records = pipeline
        .run(&attack_metrics(), &midfield_metrics(), &defence_metrics())
        .unwrap();
    assert_records(&records, &expected());
    assert!((records[0].overall - 254.0 / 3.0).abs() < EPS);
}

#[test]
fn missing_metric_fails_the_category() {
    let mut defence = RawMetrics::new();
    for team in ["A", "B", "C"] {
        defence.insert(team, "tackles_tklw", 5.0);
        defence.insert(team, "tackles_tkl", 10.0);
        defence.insert(team, "int", 3.0);
        defence.insert(team, "performance_sota", 90.0);
        if team != "B" {
            defence.insert(team, "performance_ga", 40.0);
        }
    }
    let err = RatingPipeline::new(SinkConfig::default())
        .run(&attack_metrics(), &midfield_metrics(), &defence)
        .unwrap_err();
    match err {
        PipelineError::Aggregate(AggregateError::MissingMetric(missing)) => {
            assert_eq!(missing.category, Category::Defence);
            assert_eq!(missing.metric, "performance_ga");
            assert_eq!(missing.team.as_deref(), Some("B"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn zero_tackles_attempted_is_a_missing_metric() {
    let mut defence = defence_metrics();
    defence.insert("C", "tackles_tkl", 0.0);
    let err = compute_category(&defence, &CategorySpec::defence()).unwrap_err();
    match err {
        AggregateError::MissingMetric(missing) => {
            assert_eq!(missing.metric, TACKLES_WIN_PCT);
            assert_eq!(missing.team.as_deref(), Some("C"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn merge_drops_teams_missing_a_category() {
    let score = |category, team: &str, value| CategoryScore {
        category,
        team: team.to_string(),
        value,
    };
    let attack = vec![
        score(Category::Attack, "C", 70.0),
        score(Category::Attack, "A", 70.0),
        score(Category::Attack, "D", 90.0),
    ];
    let midfield = vec![
        score(Category::Midfield, "A", 60.0),
        score(Category::Midfield, "C", 40.0),
        score(Category::Midfield, "D", 90.0),
    ];
    let defence = vec![
        score(Category::Defence, "A", 80.0),
        score(Category::Defence, "C", 80.0),
    ];

    let merged = merge_categories(&attack, &midfield, &defence);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].team, "A");
    assert!((merged[0].overall - 70.0).abs() < EPS);
    assert_eq!(merged[1].team, "C");
    assert!((merged[1].overall - 190.0 / 3.0).abs() < EPS);
}

#[test]
fn overall_is_mean_of_category_scores() {
    let scores = |category, values: &[(&str, f64)]| -> Vec<CategoryScore> {
        values
            .iter()
            .map(|(team, value)| CategoryScore {
                category,
                team: team.to_string(),
                value: *value,
            })
            .collect()
    };
    let attack = scores(Category::Attack, &[("A", 60.0), ("B", 50.0), ("C", 90.0), ("D", 80.0)]);
    let midfield = scores(Category::Midfield, &[("A", 70.0), ("B", 50.0), ("C", 40.0), ("D", 80.0)]);
    let defence = scores(Category::Defence, &[("A", 80.0), ("B", 50.0), ("C", 60.0)]);

    let merged = merge_categories(&attack, &midfield, &defence);
    let teams: Vec<&str> = merged.iter().map(|r| r.team.as_str()).collect();
    assert_eq!(teams, vec!["A", "B", "C"]);
    assert!((merged[0].overall - 70.0).abs() < EPS);
    assert!((merged[1].overall - 50.0).abs() < EPS);
    assert!((merged[2].overall - 190.0 / 3.0).abs() < EPS);
}

/// Long-form table with a squad row per team and an opponent row carrying
/// values that would skew every score if it leaked into the ratings.
fn long_table(columns: &[&str], rows: &[(&str, Vec<f64>)]) -> StatTable {
    let mut header = vec!["Squad".to_string()];
    header.extend(columns.iter().map(|c| c.to_string()));
    header.push("Value".to_string());

    let mut out = Vec::new();
    for (perspective, scale) in [("opponent", 1000.0), ("squad", 1.0)] {
        for (team, values) in rows {
            let mut row = vec![Cell::text(*team)];
            row.extend(values.iter().map(|v| Cell::Number(v * scale)));
            row.push(Cell::text(perspective));
            out.push(row);
        }
    }
    StatTable::new(header, out)
}

fn project(raw: &RawMetrics, columns: &[&str]) -> Vec<(&'static str, Vec<f64>)> {
    ["A", "B", "C"]
        .into_iter()
        .map(|team| {
            let values = columns
                .iter()
                .map(|c| raw.get(team, c).expect("metric should exist"))
                .collect();
            (team, values)
        })
        .collect()
}

fn seeded_sink() -> SqliteSink {
    let mut sink = SqliteSink::in_memory().unwrap();
    let attack = attack_metrics();
    let midfield = midfield_metrics();
    let defence = defence_metrics();
    let tables = [
        (SHOOTING_STATS, &attack, vec!["standard_gls", "standard_sot"]),
        (STANDARD_STATS, &attack, vec!["poss"]),
        (PASSING_STATS, &midfield, vec!["ast", "kp"]),
        (
            PASSING_TYPES_STATS,
            &midfield,
            vec!["passtypes_crs", "outcomes_off", "outcomes_blocks"],
        ),
        (
            DEFENSIVE_ACTION_STATS,
            &defence,
            vec!["tackles_tklw", "tackles_tkl", "int"],
        ),
        (
            GOALKEEPING_STATS,
            &defence,
            vec!["performance_ga", "performance_sota"],
        ),
    ];
    for (name, raw, columns) in tables {
        let table = long_table(&columns, &project(raw, &columns));
        sink.write_table(name, &table, WriteMode::Replace).unwrap();
    }
    sink
}

#[test]
fn ratings_round_trip_through_sqlite() {
    let mut sink = seeded_sink();
    let pipeline = RatingPipeline::new(SinkConfig::default());
    let records = pipeline.compute_and_store(&mut sink).unwrap();
    assert_records(&records, &expected());
    assert_eq!(records[0].team, "a");

    let stored = sink.read_table(RATINGS_TABLE, &[]).unwrap();
    assert_eq!(
        stored.columns,
        vec!["squad", "attack", "midfield", "defence", "overall"]
    );
    assert_eq!(stored.len(), 3);
    assert_eq!(stored.cell(2, "squad"), Some(&Cell::text("c")));

    // a second run replaces rather than appends
    pipeline.compute_and_store(&mut sink).unwrap();
    assert_eq!(sink.read_table(RATINGS_TABLE, &[]).unwrap().len(), 3);
}

#[test]
fn category_metrics_inner_join_source_tables() {
    let mut sink = seeded_sink();
    let gk = long_table(
        &["performance_ga", "performance_sota"],
        &[("A", vec![30.0, 100.0]), ("B", vec![60.0, 150.0])],
    );
    sink.write_table(GOALKEEPING_STATS, &gk, WriteMode::Replace)
        .unwrap();

    let raw = load_category_metrics(&sink, &CategorySpec::defence()).unwrap();
    assert_eq!(raw.teams(), ["a".to_string(), "b".to_string()]);
    assert_eq!(raw.get("a", "tackles_tklw"), Some(10.0));
    assert_eq!(raw.get("b", "performance_sota"), Some(150.0));
}

#[test]
fn absent_source_column_is_a_missing_metric() {
    let mut sink = seeded_sink();
    let gk = long_table(&["performance_sota"], &[("A", vec![100.0])]);
    sink.write_table(GOALKEEPING_STATS, &gk, WriteMode::Replace)
        .unwrap();

    let err = load_category_metrics(&sink, &CategorySpec::defence()).unwrap_err();
    match err {
        PipelineError::Aggregate(AggregateError::MissingMetric(missing)) => {
            assert_eq!(missing.metric, "performance_ga");
            assert_eq!(missing.team, None);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn per_metric_floor_overrides_the_default() {
    let attack = CategorySpec {
        category: Category::Attack,
        metrics: vec![
            MetricSpec::column(SHOOTING_STATS, "standard_gls", Polarity::Ascending)
                .with_range(RankRange::new(0.0, 100.0)),
        ],
    };
    let pipeline = RatingPipeline::new(SinkConfig::default()).with_specs(
        attack,
        CategorySpec::midfield(),
        CategorySpec::defence(),
    );
    let records = pipeline
        .run(&attack_metrics(), &midfield_metrics(), &defence_metrics())
        .unwrap();
    let attack: Vec<f64> = records.iter().map(|r| r.attack).collect();
    assert_eq!(attack, vec![100.0, 0.0, 50.0]);
}

#[test]
fn appended_duplicate_squad_rows_are_rejected() {
    let mut sink = seeded_sink();
    let repeat = long_table(&["standard_gls", "standard_sot"], &[("A", vec![99.0, 99.0])]);
    sink.write_table(SHOOTING_STATS, &repeat, WriteMode::Append)
        .unwrap();

    let err = load_category_metrics(&sink, &CategorySpec::attack()).unwrap_err();
    match err {
        PipelineError::DuplicateRow { table, team } => {
            assert_eq!(table, SHOOTING_STATS);
            assert_eq!(team, "a");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(RatingPipeline::new(SinkConfig::default())
        .compute_and_store(&mut sink)
        .is_err());
}

#[test]
fn pipeline_opens_its_configured_database() {
    let mut path = std::env::temp_dir();
    path.push(format!("pl_ratings_open_sink_{}.sqlite", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let config = SinkConfig {
        database: path.display().to_string(),
        ..SinkConfig::default()
    };
    let pipeline = RatingPipeline::new(config);
    {
        let mut sink = pipeline.open_sink().expect("sink should open");
        sink.write_table(RATINGS_TABLE, &ratings_table(&expected()), WriteMode::Replace)
            .unwrap();
    }

    let reopened = pipeline.open_sink().expect("sink should reopen");
    assert_eq!(reopened.read_table(RATINGS_TABLE, &[]).unwrap().len(), 3);
    assert_eq!(pipeline.config().database, path.display().to_string());

    drop(reopened);
    std::fs::remove_file(&path).ok();
}
