use serde::{Deserialize, Serialize};

use crate::error::RankDegenerateError;

pub const DEFAULT_CEILING: f64 = 100.0;
pub const DEFAULT_ASCENDING_FLOOR: f64 = 40.0;
pub const DEFAULT_INVERSE_FLOOR: f64 = 35.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Higher raw value scores higher.
    Ascending,
    /// Lower raw value scores higher (goals conceded, miscontrols).
    Inverse,
}

/// Output bounds of a normalized score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankRange {
    pub min_pct: f64,
    pub max_pct: f64,
}

impl RankRange {
    pub const fn new(min_pct: f64, max_pct: f64) -> Self {
        Self { min_pct, max_pct }
    }

    pub const fn ascending_default() -> Self {
        Self::new(DEFAULT_ASCENDING_FLOOR, DEFAULT_CEILING)
    }

    pub const fn inverse_default() -> Self {
        Self::new(DEFAULT_INVERSE_FLOOR, DEFAULT_CEILING)
    }

    pub fn default_for(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Ascending => Self::ascending_default(),
            Polarity::Inverse => Self::inverse_default(),
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_pct + self.max_pct) / 2.0
    }

    fn span(&self) -> f64 {
        self.max_pct - self.min_pct
    }
}

/// What to do when every value in a series is equal and ranks have no spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Every entry scores the middle of the range.
    #[default]
    Midpoint,
    Reject,
}

/// Fractional ("average") ranking, 1-based. Tied values share the mean of the
/// ranks they occupy: `[10, 10, 20]` ranks to `[1.5, 1.5, 3]`.
pub fn rank(series: &[f64]) -> Result<Vec<f64>, RankDegenerateError> {
    if let Some((index, value)) = series.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(RankDegenerateError::NonFinite {
            index,
            value: *value,
        });
    }

    let mut order: Vec<usize> = (0..series.len()).collect();
    order.sort_by(|a, b| series[*a].total_cmp(&series[*b]));

    let mut ranks = vec![0.0; series.len()];
    let mut start = 0usize;
    while start < order.len() {
        let value = series[order[start]];
        let mut end = start + 1;
        while end < order.len() && series[order[end]] == value {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let shared = (start + 1 + end) as f64 / 2.0;
        for pos in &order[start..end] {
            ranks[*pos] = shared;
        }
        start = end;
    }
    Ok(ranks)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PercentileRanker {
    pub degenerate: DegeneratePolicy,
}

impl PercentileRanker {
    pub fn new(degenerate: DegeneratePolicy) -> Self {
        Self { degenerate }
    }

    /// Rescale ranks of `series` linearly onto `range`, flipping direction for
    /// inverse metrics.
    pub fn score(
        &self,
        series: &[f64],
        polarity: Polarity,
        range: RankRange,
    ) -> Result<Vec<f64>, RankDegenerateError> {
        let ranks = rank(series)?;
        if ranks.is_empty() {
            return Ok(ranks);
        }

        let min_rank = ranks.iter().copied().fold(f64::INFINITY, f64::min);
        let max_rank = ranks.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let spread = max_rank - min_rank;
        if spread <= 0.0 {
            return match self.degenerate {
                DegeneratePolicy::Midpoint => Ok(vec![range.midpoint(); ranks.len()]),
                DegeneratePolicy::Reject => Err(RankDegenerateError::AllEqual { len: ranks.len() }),
            };
        }

        Ok(ranks
            .into_iter()
            .map(|r| {
                let t = (r - min_rank) / spread;
                match polarity {
                    Polarity::Ascending => range.min_pct + t * range.span(),
                    Polarity::Inverse => range.max_pct - t * range.span(),
                }
            })
            .collect())
    }
}

pub fn percentile_rank(series: &[f64], range: RankRange) -> Result<Vec<f64>, RankDegenerateError> {
    PercentileRanker::default().score(series, Polarity::Ascending, range)
}

pub fn inverse_percentile_rank(
    series: &[f64],
    range: RankRange,
) -> Result<Vec<f64>, RankDegenerateError> {
    PercentileRanker::default().score(series, Polarity::Inverse, range)
}
