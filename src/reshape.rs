use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::{CombineError, ReshapeError};
use crate::table::{
    Cell, ColumnHeader, PERSPECTIVE_COLUMN, Perspective, RawStatTable, StatTable, TEAM_COLUMN,
    TEAM_COLUMN_NORMALIZED,
};

const OVERALL_PREFIX: &str = "Overall_";
const REGULAR_SEASON_KEYS: [&str; 2] = ["Rk", TEAM_COLUMN];

// Multi-character patterns must run before the lone `+` / `-` rules.
const NAME_SUBSTITUTIONS: [(&str, &str); 7] = [
    ("+/-", "_plus_minus"),
    ("#", "num"),
    ("/", "_per_"),
    ("%", "_pct"),
    ("-", "_"),
    (":", "_"),
    ("+", "_and_"),
];

/// Collapse two-level headers into single identifiers.
///
/// Grouped columns become `Top_Bottom` with whitespace removed inside each
/// level. Columns whose top level is missing or an extractor placeholder keep
/// only the bottom level, with whitespace runs turned into `_`.
pub fn flatten(table: &RawStatTable) -> Result<StatTable, ReshapeError> {
    let mut columns = Vec::with_capacity(table.headers.len());
    let mut seen = HashSet::new();
    for (index, header) in table.headers.iter().enumerate() {
        let name = flatten_header(header).ok_or(ReshapeError::EmptyHeader { index })?;
        if !seen.insert(name.clone()) {
            return Err(ReshapeError::DuplicateColumn(name));
        }
        columns.push(name);
    }

    for (row, cells) in table.rows.iter().enumerate() {
        if cells.len() != columns.len() {
            return Err(ReshapeError::RowWidth {
                row,
                expected: columns.len(),
                found: cells.len(),
            });
        }
    }

    Ok(StatTable::new(columns, table.rows.clone()))
}

fn flatten_header(header: &ColumnHeader) -> Option<String> {
    let bottom = header.bottom.trim();
    if bottom.is_empty() {
        return None;
    }
    if header.has_placeholder_top() {
        return Some(bottom.split_whitespace().collect::<Vec<_>>().join("_"));
    }
    let top = header.top.as_deref().unwrap_or_default();
    Some(format!("{}_{}", squash_whitespace(top), squash_whitespace(bottom)))
}

fn squash_whitespace(level: &str) -> String {
    level.split_whitespace().collect()
}

pub fn normalize_column_name(name: &str) -> String {
    let mut out = name.to_string();
    for (pattern, replacement) in NAME_SUBSTITUTIONS {
        if out.contains(pattern) {
            out = out.replace(pattern, replacement);
        }
    }
    out.to_lowercase()
}

/// Rewrite every column name into a SQL-friendly identifier and lowercase the
/// team column. Running it twice changes nothing.
pub fn normalize_column_names(table: &mut StatTable) {
    for column in &mut table.columns {
        *column = normalize_column_name(column);
    }
    let Some(idx) = table.column_index(TEAM_COLUMN_NORMALIZED) else {
        return;
    };
    for row in &mut table.rows {
        if let Some(Cell::Text(team)) = row.get_mut(idx) {
            *team = team.to_lowercase();
        }
    }
}

/// Merge a squad table with its mirrored opponent table into one long-form
/// table. Opponent rows come first; both parts keep their input order.
pub fn combine_squad_opponent(
    squad_table: &RawStatTable,
    opponent_table: &RawStatTable,
) -> Result<StatTable, CombineError> {
    let mut squad = flatten(squad_table).map_err(|source| CombineError::Flatten {
        side: Perspective::Squad.as_str(),
        source,
    })?;
    let mut opponent = flatten(opponent_table).map_err(|source| CombineError::Flatten {
        side: Perspective::Opponent.as_str(),
        source,
    })?;

    let Some(team_idx) = opponent.column_index(TEAM_COLUMN) else {
        return Err(CombineError::MissingTeamColumn {
            side: Perspective::Opponent.as_str(),
            column: TEAM_COLUMN,
        });
    };
    let Some(squad_team_idx) = squad.column_index(TEAM_COLUMN) else {
        return Err(CombineError::MissingTeamColumn {
            side: Perspective::Squad.as_str(),
            column: TEAM_COLUMN,
        });
    };
    if squad.columns != opponent.columns {
        return Err(CombineError::ColumnMismatch {
            squad: squad.columns.len(),
            opponent: opponent.columns.len(),
        });
    }

    for row in &mut opponent.rows {
        if let Some(Cell::Text(team)) = row.get_mut(team_idx) {
            *team = strip_versus_marker(team);
        }
    }

    ensure_unique_teams(&squad, squad_team_idx, Perspective::Squad)?;
    ensure_unique_teams(&opponent, team_idx, Perspective::Opponent)?;

    opponent.push_constant_column(PERSPECTIVE_COLUMN, Cell::text(Perspective::Opponent.as_str()));
    squad.push_constant_column(PERSPECTIVE_COLUMN, Cell::text(Perspective::Squad.as_str()));

    debug!(
        "combined {} opponent rows with {} squad rows",
        opponent.len(),
        squad.len()
    );

    let mut rows = opponent.rows;
    rows.extend(squad.rows);
    Ok(StatTable::new(opponent.columns, rows))
}

// Team identity is lowercased on write, so "Arsenal" and "ARSENAL" collide.
fn ensure_unique_teams(
    table: &StatTable,
    team_idx: usize,
    perspective: Perspective,
) -> Result<(), CombineError> {
    let mut seen = HashSet::with_capacity(table.len());
    for row in &table.rows {
        let team = row[team_idx].join_key().to_lowercase();
        if !seen.insert(team.clone()) {
            return Err(CombineError::DuplicateTeam {
                side: perspective.as_str(),
                team,
            });
        }
    }
    Ok(())
}

/// "vs Arsenal" -> "Arsenal"
pub fn strip_versus_marker(team: &str) -> String {
    team.split_whitespace().skip(1).collect::<Vec<_>>().join(" ")
}

/// Join the overall league table with the home/away split on (`Rk`, `Squad`).
/// Overall columns other than the keys get an `Overall_` prefix. Keys must be
/// unique on both sides.
pub fn merge_regular_season(
    overall_table: &RawStatTable,
    home_away_table: &RawStatTable,
) -> Result<StatTable, ReshapeError> {
    let mut overall = flatten(overall_table)?;
    for (column, header) in overall.columns.iter_mut().zip(&overall_table.headers) {
        if REGULAR_SEASON_KEYS.contains(&column.as_str()) {
            continue;
        }
        let base = if header.has_placeholder_top() {
            squash_whitespace(&header.bottom)
        } else {
            column.clone()
        };
        *column = format!("{OVERALL_PREFIX}{base}");
    }
    let home_away = flatten(home_away_table)?;

    let left_keys = key_indices(&overall)?;
    let right_keys = key_indices(&home_away)?;

    let mut right_index: HashMap<String, usize> = HashMap::with_capacity(home_away.len());
    for (pos, row) in home_away.rows.iter().enumerate() {
        let key = row_key(row, &right_keys);
        if right_index.insert(key.clone(), pos).is_some() {
            return Err(ReshapeError::DuplicateKey { side: "home/away", key });
        }
    }

    let right_extra: Vec<usize> = (0..home_away.columns.len())
        .filter(|idx| !right_keys.contains(idx))
        .collect();

    let mut columns = overall.columns.clone();
    for idx in &right_extra {
        let name = &home_away.columns[*idx];
        if columns.contains(name) {
            return Err(ReshapeError::DuplicateColumn(name.clone()));
        }
        columns.push(name.clone());
    }

    let mut seen_left = HashSet::new();
    let mut rows = Vec::with_capacity(overall.len());
    for row in &overall.rows {
        let key = row_key(row, &left_keys);
        if !seen_left.insert(key.clone()) {
            return Err(ReshapeError::DuplicateKey { side: "overall", key });
        }
        let Some(pos) = right_index.get(&key) else {
            continue;
        };
        let right = &home_away.rows[*pos];
        let mut merged = row.clone();
        merged.extend(right_extra.iter().map(|idx| right[*idx].clone()));
        rows.push(merged);
    }

    Ok(StatTable::new(columns, rows))
}

fn key_indices(table: &StatTable) -> Result<Vec<usize>, ReshapeError> {
    REGULAR_SEASON_KEYS
        .iter()
        .map(|key| {
            table
                .column_index(key)
                .ok_or_else(|| ReshapeError::MissingColumn((*key).to_string()))
        })
        .collect()
}

fn row_key(row: &[Cell], indices: &[usize]) -> String {
    indices
        .iter()
        .map(|idx| row[*idx].join_key())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::{normalize_column_name, strip_versus_marker};

    #[test]
    fn symbol_substitutions() {
        assert_eq!(normalize_column_name("Per90Minutes_G+A"), "per90minutes_g_and_a");
        assert_eq!(normalize_column_name("Performance_+/-"), "performance__plus_minus");
        assert_eq!(normalize_column_name("Performance_Save%"), "performance_save_pct");
        assert_eq!(normalize_column_name("#Pl"), "numpl");
        assert_eq!(normalize_column_name("Expected_npxG/Sh"), "expected_npxg_per_sh");
        assert_eq!(normalize_column_name("Take-Ons_Att"), "take_ons_att");
        assert_eq!(normalize_column_name("Unnamed:_1"), "unnamed__1");
    }

    #[test]
    fn versus_marker_is_dropped() {
        assert_eq!(strip_versus_marker("vs Manchester City"), "Manchester City");
        assert_eq!(strip_versus_marker("vs  Arsenal "), "Arsenal");
        assert_eq!(strip_versus_marker("vs"), "");
    }
}
