use std::path::Path;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter};

use crate::config::{SinkConfig, WriteMode};
use crate::error::{SinkError, SinkTransactionError};
use crate::reshape::normalize_column_names;
use crate::table::{Cell, StatTable};

/// One completed ingest run, kept as an audit row by sinks that support it.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub job: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tables_written: usize,
    pub rows_written: usize,
}

/// Durable store for canonical tables.
///
/// Every `write_table` call is atomic: it either commits in full or leaves the
/// previously committed state of that table untouched.
pub trait TableSink {
    fn write_table(
        &mut self,
        name: &str,
        table: &StatTable,
        mode: WriteMode,
    ) -> Result<usize, SinkError>;

    /// Read `columns` (all columns when empty) from `name`.
    fn read_table(&self, name: &str, columns: &[&str]) -> Result<StatTable, SinkError>;

    fn record_run(&mut self, _run: &RunRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(config: &SinkConfig) -> Result<Self, SinkError> {
        info!("Establishing Connection with DB {}", config.summary());
        Self::open_path(&config.database_path())
    }

    pub fn open_path(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!("unable to create {}: {err}", parent.display());
            }
        }
        let conn = Connection::open(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let sink = Self { conn };
        sink.init_schema().map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(sink)
    }

    pub fn in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory().map_err(|source| SinkError::Open {
            path: ":memory:".into(),
            source,
        })?;
        let sink = Self { conn };
        sink.init_schema().map_err(|source| SinkError::Open {
            path: ":memory:".into(),
            source,
        })?;
        Ok(sink)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ingest_runs (
                run_id INTEGER PRIMARY KEY AUTOINCREMENT,
                job TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                tables_written INTEGER NOT NULL,
                rows_written INTEGER NOT NULL
            );
            "#,
        )
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, SinkError> {
        table_exists(&self.conn, name).map_err(|source| SinkError::Read {
            table: name.to_string(),
            source,
        })
    }

    /// Rows of `table` whose `column` equals `value`, compared case-insensitively.
    pub fn find_rows(&self, table: &str, column: &str, value: &str) -> Result<StatTable, SinkError> {
        if !self.table_exists(table)? {
            return Err(SinkError::UnknownTable(table.to_string()));
        }
        let sql = format!(
            "SELECT * FROM {} WHERE lower({}) = lower(?1)",
            quote_ident(table),
            quote_ident(column)
        );
        query_table(&self.conn, table, &sql, params![value])
    }

    pub fn runs(&self) -> Result<Vec<(String, usize, usize)>, SinkError> {
        let read_err = |source| SinkError::Read {
            table: "ingest_runs".to_string(),
            source,
        };
        let mut stmt = self
            .conn
            .prepare(
                "SELECT job, tables_written, rows_written FROM ingest_runs ORDER BY run_id ASC",
            )
            .map_err(read_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)? as usize,
                    row.get::<_, i64>(2)? as usize,
                ))
            })
            .map_err(read_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(read_err)?);
        }
        Ok(out)
    }
}

impl TableSink for SqliteSink {
    fn write_table(
        &mut self,
        name: &str,
        table: &StatTable,
        mode: WriteMode,
    ) -> Result<usize, SinkError> {
        let mut table = table.clone();
        normalize_column_names(&mut table);

        let tx = self
            .conn
            .transaction()
            .map_err(|source| transaction_error(name, source))?;

        match write_in_transaction(&tx, name, &table, mode) {
            Ok(rows) => {
                tx.commit().map_err(|source| transaction_error(name, source))?;
                info!("{name} has been successfully committed ({rows} rows, mode={mode}).");
                Ok(rows)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("rollback of {name} failed: {rollback_err}");
                }
                error!("Error occurred in uploading {name}. Transaction has been rolled back.");
                error!("Error message: {err}");
                Err(err)
            }
        }
    }

    fn read_table(&self, name: &str, columns: &[&str]) -> Result<StatTable, SinkError> {
        if !self.table_exists(name)? {
            return Err(SinkError::UnknownTable(name.to_string()));
        }
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sql = format!("SELECT {projection} FROM {}", quote_ident(name));
        query_table(&self.conn, name, &sql, [])
    }

    fn record_run(&mut self, run: &RunRecord) -> Result<(), SinkError> {
        self.conn
            .execute(
                "INSERT INTO ingest_runs(job, started_at, finished_at, tables_written, rows_written)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run.job,
                    run.started_at.to_rfc3339(),
                    run.finished_at.to_rfc3339(),
                    run.tables_written as i64,
                    run.rows_written as i64,
                ],
            )
            .map_err(|source| transaction_error("ingest_runs", source))?;
        Ok(())
    }
}

fn write_in_transaction(
    tx: &Transaction<'_>,
    name: &str,
    table: &StatTable,
    mode: WriteMode,
) -> Result<usize, SinkError> {
    let exists = table_exists(tx, name).map_err(|source| transaction_error(name, source))?;
    let create = match (mode, exists) {
        (WriteMode::Fail, true) => return Err(SinkError::TableExists(name.to_string())),
        (WriteMode::Replace, true) => {
            tx.execute_batch(&format!("DROP TABLE {}", quote_ident(name)))
                .map_err(|source| transaction_error(name, source))?;
            true
        }
        (WriteMode::Append, true) => false,
        (_, false) => true,
    };

    if create {
        tx.execute_batch(&create_table_sql(name, table))
            .map_err(|source| transaction_error(name, source))?;
    }

    let columns = table
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=table.columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({columns}) VALUES ({placeholders})",
        quote_ident(name)
    );
    let mut stmt = tx
        .prepare(&sql)
        .map_err(|source| transaction_error(name, source))?;
    for row in &table.rows {
        stmt.execute(params_from_iter(row.iter()))
            .map_err(|source| transaction_error(name, source))?;
    }
    Ok(table.rows.len())
}

fn create_table_sql(name: &str, table: &StatTable) -> String {
    let columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| format!("{} {}", quote_ident(column), column_type(table, idx)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({columns})", quote_ident(name))
}

/// REAL when every non-null cell is numeric, TEXT otherwise.
fn column_type(table: &StatTable, idx: usize) -> &'static str {
    let mut any_value = false;
    for row in &table.rows {
        match row.get(idx) {
            Some(Cell::Number(_)) => any_value = true,
            Some(Cell::Text(_)) => return "TEXT",
            _ => {}
        }
    }
    if any_value { "REAL" } else { "TEXT" }
}

fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

fn query_table<P: rusqlite::Params>(
    conn: &Connection,
    table: &str,
    sql: &str,
    params: P,
) -> Result<StatTable, SinkError> {
    let read_err = |source| SinkError::Read {
        table: table.to_string(),
        source,
    };
    let mut stmt = conn.prepare(sql).map_err(read_err)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();
    let rows = stmt
        .query_map(params, |row| {
            (0..width)
                .map(|idx| row.get::<_, Cell>(idx))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .map_err(read_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(read_err)?);
    }
    Ok(StatTable::new(columns, out))
}

fn transaction_error(table: &str, source: rusqlite::Error) -> SinkError {
    SinkError::Transaction(SinkTransactionError {
        table: table.to_string(),
        source,
    })
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
