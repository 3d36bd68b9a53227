use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::bars::{PartitionSource, RawBar, ReadWindow, StoreError};

/// A bar store laid out as one table per calendar year, named by the year
/// (`"2023"`), with columns `sym, ti, o, h, l, c, v`.
pub struct SqlitePartitions<'c> {
    conn: &'c Connection,
}

impl<'c> SqlitePartitions<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

/// Parse a table name as a partition year.
fn partition_year(name: &str) -> Option<i32> {
    if name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit()) {
        name.parse().ok()
    } else {
        None
    }
}

fn classify(year: i32, e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => {
            StoreError::Integrity(format!("partition {year}: {e}"))
        }
        other => StoreError::Unavailable(format!("partition {year}: {other}")),
    }
}

fn sql_value_to_json(val: SqlValue) -> Value {
    match val {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Number(i.into()),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

fn row_to_bar(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBar> {
    Ok(RawBar {
        ti: row.get(0)?,
        o: sql_value_to_json(row.get(1)?),
        h: sql_value_to_json(row.get(2)?),
        l: sql_value_to_json(row.get(3)?),
        c: sql_value_to_json(row.get(4)?),
        v: sql_value_to_json(row.get(5)?),
    })
}

impl PartitionSource for SqlitePartitions<'_> {
    fn partitions(&self) -> Result<BTreeSet<i32>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(names.iter().filter_map(|n| partition_year(n)).collect())
    }

    fn read(&self, year: i32, symbol: &str, window: ReadWindow) -> Result<Vec<RawBar>, StoreError> {
        let rows = match window {
            ReadWindow::AtOrBefore { end_ts, limit } => {
                let limit = i64::try_from(limit).unwrap_or(i64::MAX);
                let sql = format!(
                    "SELECT ti, o, h, l, c, v FROM \"{year}\"
                     WHERE sym = ?1 AND ti <= ?2
                     ORDER BY ti DESC
                     LIMIT ?3"
                );
                self.conn
                    .prepare(&sql)
                    .and_then(|mut stmt| {
                        let bars = stmt
                            .query_map(params![symbol, end_ts, limit], row_to_bar)?
                            .collect::<Result<Vec<_>, _>>();
                        bars
                    })
            }
            ReadWindow::Between { from_ts, to_ts } => {
                let sql = format!(
                    "SELECT ti, o, h, l, c, v FROM \"{year}\"
                     WHERE sym = ?1 AND ti >= ?2 AND ti <= ?3
                     ORDER BY ti ASC"
                );
                self.conn
                    .prepare(&sql)
                    .and_then(|mut stmt| {
                        let bars = stmt
                            .query_map(params![symbol, from_ts, to_ts], row_to_bar)?
                            .collect::<Result<Vec<_>, _>>();
                        bars
                    })
            }
        };
        rows.map_err(|e| classify(year, e))
    }

    fn distinct_symbols(&self, year: i32) -> Result<Vec<String>, StoreError> {
        let sql = format!("SELECT DISTINCT sym FROM \"{year}\" WHERE sym IS NOT NULL");
        self.conn
            .prepare(&sql)
            .and_then(|mut stmt| {
                let symbols = stmt
                    .query_map([], |row| row.get::<_, SqlValue>(0))?
                    .filter_map(|sym| match sym {
                        Ok(SqlValue::Text(s)) => Some(Ok(s)),
                        Ok(other) => {
                            tracing::warn!("partition {year}: skipping non-text symbol {other:?}");
                            None
                        }
                        Err(e) => Some(Err(e)),
                    })
                    .collect::<Result<Vec<_>, _>>();
                symbols
            })
            .map_err(|e| classify(year, e))
    }
}
