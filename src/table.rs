use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};

/// Column holding team identity before and after normalization.
pub const TEAM_COLUMN: &str = "Squad";
pub const TEAM_COLUMN_NORMALIZED: &str = "squad";

/// Column tagging each long-form row with its perspective.
pub const PERSPECTIVE_COLUMN: &str = "Value";
pub const PERSPECTIVE_COLUMN_NORMALIZED: &str = "value";

const PLACEHOLDER_MARKER: &str = "Unnamed";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnHeader {
    #[serde(default)]
    pub top: Option<String>,
    pub bottom: String,
}

impl ColumnHeader {
    pub fn single(bottom: impl Into<String>) -> Self {
        Self {
            top: None,
            bottom: bottom.into(),
        }
    }

    pub fn nested(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self {
            top: Some(top.into()),
            bottom: bottom.into(),
        }
    }

    /// Extractors emit "Unnamed: N_level_0" style tops for columns without a group.
    pub fn has_placeholder_top(&self) -> bool {
        match self.top.as_deref() {
            None => true,
            Some(top) => top.trim().is_empty() || top.contains(PLACEHOLDER_MARKER),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the cell. Extracted text such as "1,234" parses too.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => {
                let cleaned = s.trim().replace(',', "");
                if cleaned.is_empty() {
                    return None;
                }
                cleaned.parse::<f64>().ok()
            }
            Cell::Null => None,
        }
    }

    /// Stable textual key used when joining tables on cell values. Numeric
    /// text keys the same as the number it spells, so `"1.0"` matches `1`.
    pub fn join_key(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Number(n) => format!("{n}"),
            Cell::Text(s) => match self.as_f64().filter(|n| n.is_finite()) {
                Some(n) => format!("{n}"),
                None => s.trim().to_string(),
            },
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(Value::Null),
            Cell::Number(n) => ToSqlOutput::Owned(Value::Real(*n)),
            Cell::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for Cell {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Cell::Null),
            ValueRef::Integer(i) => Ok(Cell::Number(i as f64)),
            ValueRef::Real(f) => Ok(Cell::Number(f)),
            ValueRef::Text(t) => Ok(Cell::Text(String::from_utf8_lossy(t).into_owned())),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// A table as it comes out of the extraction source: possibly two-level
/// headers, rows keyed positionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawStatTable {
    pub headers: Vec<ColumnHeader>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawStatTable {
    pub fn new(headers: Vec<ColumnHeader>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }
}

/// Single-level table. Canonical once flattened and normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl StatTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&Cell::Null))
                .collect(),
        )
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx)
    }

    /// Appends a column holding `value` on every row.
    pub fn push_constant_column(&mut self, name: impl Into<String>, value: Cell) {
        self.columns.push(name.into());
        for row in &mut self.rows {
            row.push(value.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    Squad,
    Opponent,
}

impl Perspective {
    pub fn as_str(self) -> &'static str {
        match self {
            Perspective::Squad => "squad",
            Perspective::Opponent => "opponent",
        }
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
