//! SQLite3 connector.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Either, Executor, Row, Statement, TypeInfo, ValueRef};

use common::errors::{AppError, AppResult};
use common::models::{ColumnInfo, DbType, MEMORY_DATABASE};

use super::output::{float_value, header_recovery_target, hex_literal, OutputCollector};
use super::{close_connection, connect_within, query_error, Connector, StatementOutput};

/// Runs queries against a SQLite database file or an in-memory database.
pub struct SqliteConnector {
    options: SqliteConnectOptions,
    connect_timeout: Duration,
}

impl SqliteConnector {
    /// Accepts a file path, `:memory:` or a `sqlite:` URL.
    ///
    /// Plain paths are created when missing.
    pub fn new(connection: &str, connect_timeout: Duration) -> AppResult<Self> {
        let target = connection.trim();
        let options = if target.is_empty() || target == MEMORY_DATABASE {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| AppError::DatabaseConnection(e.to_string()))?
        } else if target.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(target)
                .map_err(|e| AppError::DatabaseConnection(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(target)
                .create_if_missing(true)
        };

        Ok(Self {
            options,
            connect_timeout,
        })
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    fn db_type(&self) -> DbType {
        DbType::Sqlite3
    }

    async fn execute(&self, query: &str, max_rows: usize) -> AppResult<StatementOutput> {
        let mut conn = connect_within(self.connect_timeout, self.options.connect()).await?;
        let output = run(&mut conn, query, max_rows).await;
        close_connection(conn).await;
        output
    }
}

async fn run(conn: &mut SqliteConnection, query: &str, max_rows: usize) -> AppResult<StatementOutput> {
    let mut tx = conn.begin().await.map_err(query_error)?;
    let mut collector = OutputCollector::new(max_rows);
    {
        let mut stream = sqlx::raw_sql(query).fetch_many(&mut *tx);
        while let Some(step) = stream.try_next().await.map_err(query_error)? {
            match step {
                Either::Left(done) => collector.finish_statement(done.rows_affected()),
                Either::Right(row) => collector.push_row(|| columns(&row), || decode_row(&row))?,
            }
        }
    }
    tx.commit().await.map_err(query_error)?;

    let completed = collector.statements();
    let mut output = collector.finish();
    if let Some(last) = header_recovery_target(query, completed, &output) {
        // An empty result set carries no rows to read the headers from.
        if let Ok(statement) = (&mut *conn).prepare(last).await {
            output.describe(
                statement
                    .columns()
                    .iter()
                    .map(|c| ColumnInfo::new(c.name(), c.type_info().name()))
                    .collect(),
            );
        }
    }
    Ok(output)
}

fn columns(row: &SqliteRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|c| ColumnInfo::new(c.name(), c.type_info().name()))
        .collect()
}

fn decode_row(row: &SqliteRow) -> AppResult<Vec<Value>> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

/// Decodes by the storage class of the stored value, not the declared type.
fn decode_value(row: &SqliteRow, index: usize) -> AppResult<Value> {
    let raw = row.try_get_raw(index).map_err(query_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage_class = raw.type_info().name().to_string();

    let value = match storage_class.as_str() {
        "INTEGER" => Value::from(row.try_get_unchecked::<i64, _>(index).map_err(query_error)?),
        "REAL" => {
            let real = row.try_get_unchecked::<f64, _>(index).map_err(query_error)?;
            float_value(real).unwrap_or_else(|| Value::String(real.to_string()))
        }
        "BLOB" => Value::String(hex_literal(
            &row.try_get_unchecked::<Vec<u8>, _>(index).map_err(query_error)?,
        )),
        _ => Value::String(row.try_get_unchecked::<String, _>(index).map_err(query_error)?),
    };
    Ok(value)
}
