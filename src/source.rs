use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::SourceError;
use crate::table::RawStatTable;

pub const STATS_TABLES_FILE: &str = "stats_tables.json";
pub const FIXTURES_FILE: &str = "scores_and_fixtures.json";

/// League table + home/away split come before the paired stat tables.
const LEAGUE_TABLES: usize = 2;

/// Paired squad/opponent stat tables, in the order the stats page lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCategory {
    Standard,
    Goalkeeping,
    AdvancedGoalkeeping,
    Shooting,
    Passing,
    PassTypes,
    GoalShotCreation,
    DefensiveActions,
    Possession,
    PlayingTime,
    Miscellaneous,
}

impl StatCategory {
    pub const ALL: [StatCategory; 11] = [
        StatCategory::Standard,
        StatCategory::Goalkeeping,
        StatCategory::AdvancedGoalkeeping,
        StatCategory::Shooting,
        StatCategory::Passing,
        StatCategory::PassTypes,
        StatCategory::GoalShotCreation,
        StatCategory::DefensiveActions,
        StatCategory::Possession,
        StatCategory::PlayingTime,
        StatCategory::Miscellaneous,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            StatCategory::Standard => "standard_stats",
            StatCategory::Goalkeeping => "goalkeeping_stats",
            StatCategory::AdvancedGoalkeeping => "advanced_goalkeeping_stats",
            StatCategory::Shooting => "shooting_stats",
            StatCategory::Passing => "passing_stats",
            StatCategory::PassTypes => "passing_types_stats",
            StatCategory::GoalShotCreation => "goal_shot_creation_stats",
            StatCategory::DefensiveActions => "defensive_action_stats",
            StatCategory::Possession => "possession_stats",
            StatCategory::PlayingTime => "playing_time_stats",
            StatCategory::Miscellaneous => "miscellaneous_stats",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatCategory::Standard => "Standard Stats",
            StatCategory::Goalkeeping => "Goalkeeping Stats",
            StatCategory::AdvancedGoalkeeping => "Advanced Goalkeeping Stats",
            StatCategory::Shooting => "Shooting Stats",
            StatCategory::Passing => "Passing Stats",
            StatCategory::PassTypes => "Passing Types Stats",
            StatCategory::GoalShotCreation => "Goal Shot Creation Stats",
            StatCategory::DefensiveActions => "Defensive Action Stats",
            StatCategory::Possession => "Possession Stats",
            StatCategory::PlayingTime => "Playing Time Stats",
            StatCategory::Miscellaneous => "Miscellaneous Stats",
        }
    }

    // Declaration order matches `ALL`.
    fn position(self) -> usize {
        self as usize
    }
}

/// Everything one extraction run produces.
#[derive(Debug, Clone, Default)]
pub struct Extract {
    /// League overall table, home/away table, then squad/opponent pairs.
    pub stats_tables: Vec<RawStatTable>,
    pub scores_and_fixtures: RawStatTable,
}

impl Extract {
    pub fn expected_tables() -> usize {
        LEAGUE_TABLES + StatCategory::ALL.len() * 2
    }

    pub fn validate(&self) -> Result<(), SourceError> {
        let expected = Self::expected_tables();
        if self.stats_tables.len() < expected {
            return Err(SourceError::MissingTables {
                expected,
                found: self.stats_tables.len(),
            });
        }
        Ok(())
    }

    pub fn league_overall(&self) -> &RawStatTable {
        &self.stats_tables[0]
    }

    pub fn league_home_away(&self) -> &RawStatTable {
        &self.stats_tables[1]
    }

    /// (squad, opponent) tables of a category. Call `validate` first.
    pub fn pair(&self, category: StatCategory) -> (&RawStatTable, &RawStatTable) {
        let base = LEAGUE_TABLES + category.position() * 2;
        (&self.stats_tables[base], &self.stats_tables[base + 1])
    }
}

pub trait TableSource {
    fn extract(&self) -> Result<Extract, SourceError>;
}

/// Reads an extract previously dumped to a directory as JSON.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TableSource for JsonDirSource {
    fn extract(&self) -> Result<Extract, SourceError> {
        let stats_tables: Vec<RawStatTable> = read_json(&self.dir.join(STATS_TABLES_FILE))?;
        let scores_and_fixtures: RawStatTable = read_json(&self.dir.join(FIXTURES_FILE))?;
        debug!(
            "read {} stat tables and {} fixtures from {}",
            stats_tables.len(),
            scores_and_fixtures.rows.len(),
            self.dir.display()
        );
        let extract = Extract {
            stats_tables,
            scores_and_fixtures,
        };
        extract.validate()?;
        Ok(extract)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let raw = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SourceError::Json {
        path: path.to_path_buf(),
        source,
    })
}
