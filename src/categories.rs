use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ranking::{Polarity, RankRange};

pub const SHOOTING_STATS: &str = "shooting_stats";
pub const STANDARD_STATS: &str = "standard_stats";
pub const PASSING_STATS: &str = "passing_stats";
pub const PASSING_TYPES_STATS: &str = "passing_types_stats";
pub const DEFENSIVE_ACTION_STATS: &str = "defensive_action_stats";
pub const GOALKEEPING_STATS: &str = "goalkeeping_stats";

pub const TACKLES_WIN_PCT: &str = "tackles_win_pct";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Attack,
    Midfield,
    Defence,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Attack, Category::Midfield, Category::Defence];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Attack => "attack",
            Category::Midfield => "midfield",
            Category::Defence => "defence",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a metric's raw value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricInput {
    Column(String),
    /// `numerator / denominator * 100`, computed from raw counts before ranking.
    Percentage {
        numerator: String,
        denominator: String,
    },
}

impl MetricInput {
    pub fn raw_columns(&self) -> Vec<&str> {
        match self {
            MetricInput::Column(name) => vec![name.as_str()],
            MetricInput::Percentage {
                numerator,
                denominator,
            } => vec![numerator.as_str(), denominator.as_str()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    /// Canonical stat table holding the raw columns.
    pub table: String,
    pub input: MetricInput,
    pub polarity: Polarity,
    pub range: RankRange,
}

impl MetricSpec {
    pub fn column(table: &str, name: &str, polarity: Polarity) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            input: MetricInput::Column(name.to_string()),
            polarity,
            range: RankRange::default_for(polarity),
        }
    }

    pub fn percentage(
        table: &str,
        name: &str,
        numerator: &str,
        denominator: &str,
        polarity: Polarity,
    ) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            input: MetricInput::Percentage {
                numerator: numerator.to_string(),
                denominator: denominator.to_string(),
            },
            polarity,
            range: RankRange::default_for(polarity),
        }
    }

    pub fn with_range(mut self, range: RankRange) -> Self {
        self.range = range;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub category: Category,
    pub metrics: Vec<MetricSpec>,
}

impl CategorySpec {
    pub fn attack() -> Self {
        use Polarity::Ascending;
        Self {
            category: Category::Attack,
            metrics: vec![
                MetricSpec::column(SHOOTING_STATS, "standard_gls", Ascending),
                MetricSpec::column(SHOOTING_STATS, "standard_sot", Ascending),
                MetricSpec::column(STANDARD_STATS, "poss", Ascending),
            ],
        }
    }

    pub fn midfield() -> Self {
        use Polarity::{Ascending, Inverse};
        Self {
            category: Category::Midfield,
            metrics: vec![
                MetricSpec::column(PASSING_TYPES_STATS, "passtypes_crs", Ascending),
                MetricSpec::column(PASSING_STATS, "ast", Ascending),
                MetricSpec::column(PASSING_STATS, "kp", Ascending),
                MetricSpec::column(PASSING_TYPES_STATS, "outcomes_off", Inverse),
                MetricSpec::column(PASSING_TYPES_STATS, "outcomes_blocks", Inverse),
            ],
        }
    }

    pub fn defence() -> Self {
        use Polarity::{Ascending, Inverse};
        Self {
            category: Category::Defence,
            metrics: vec![
                MetricSpec::percentage(
                    DEFENSIVE_ACTION_STATS,
                    TACKLES_WIN_PCT,
                    "tackles_tklw",
                    "tackles_tkl",
                    Ascending,
                ),
                MetricSpec::column(DEFENSIVE_ACTION_STATS, "int", Ascending),
                MetricSpec::column(GOALKEEPING_STATS, "performance_ga", Inverse),
                MetricSpec::column(GOALKEEPING_STATS, "performance_sota", Inverse),
            ],
        }
    }

    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Attack => Self::attack(),
            Category::Midfield => Self::midfield(),
            Category::Defence => Self::defence(),
        }
    }

    /// Source tables in first-use order.
    pub fn source_tables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for metric in &self.metrics {
            if !out.contains(&metric.table.as_str()) {
                out.push(metric.table.as_str());
            }
        }
        out
    }

    pub fn raw_columns_for(&self, table: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for metric in self.metrics.iter().filter(|m| m.table == table) {
            for column in metric.input.raw_columns() {
                if !out.contains(&column) {
                    out.push(column);
                }
            }
        }
        out
    }
}

/// Tackles won as a share of tackles attempted, in percent. `None` when no
/// tackle was attempted.
pub fn tackle_win_pct(won: f64, attempted: f64) -> Option<f64> {
    percentage(won, attempted)
}

pub fn percentage(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    Some(numerator / denominator * 100.0)
}
