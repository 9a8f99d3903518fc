//! PostgreSQL connector.
//!
//! Queries go through the simple query protocol, so several statements can
//! be sent at once and every value arrives in its text form.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, ConnectOptions, Connection, Either, Executor, Row, Statement, TypeInfo, ValueRef};

use common::errors::{AppError, AppResult};
use common::models::{ColumnInfo, DbType};

use super::dsn;
use super::output::{float_value, header_recovery_target, OutputCollector};
use super::{close_connection, connect_within, query_error, Connector, StatementOutput};

/// Runs queries against a PostgreSQL server.
pub struct PostgresConnector {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PostgresConnector {
    /// Parses a `postgres://` URL or a libpq keyword/value string.
    pub fn new(connection: &str, default_timeout: Duration) -> AppResult<Self> {
        let target =
            dsn::parse(connection).map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        Ok(Self {
            options: target.options,
            connect_timeout: target.connect_timeout.unwrap_or(default_timeout),
        })
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    fn db_type(&self) -> DbType {
        DbType::Postgres
    }

    async fn execute(&self, query: &str, max_rows: usize) -> AppResult<StatementOutput> {
        let mut conn = connect_within(self.connect_timeout, self.options.connect()).await?;
        let output = run(&mut conn, query, max_rows).await;
        close_connection(conn).await;
        output
    }
}

async fn run(conn: &mut PgConnection, query: &str, max_rows: usize) -> AppResult<StatementOutput> {
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

fn columns(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|c| ColumnInfo::new(c.name(), c.type_info().name()))
        .collect()
}

fn decode_row(row: &PgRow) -> AppResult<Vec<Value>> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

fn decode_value(row: &PgRow, index: usize) -> AppResult<Value> {
    let raw = row.try_get_raw(index).map_err(query_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let text = row.try_get_unchecked::<&str, _>(index).map_err(query_error)?;
    Ok(text_value(&type_name, text))
}

/// Maps the text form of a value to JSON using its PostgreSQL type name.
///
/// NUMERIC stays text so no precision is lost. Non-finite floats keep the
/// server's spelling.
fn text_value(type_name: &str, text: &str) -> Value {
    match type_name {
        "BOOL" => match text {
            "t" => Value::Bool(true),
            "f" => Value::Bool(false),
            other => Value::String(other.to_string()),
        },
        "INT2" | "INT4" | "INT8" | "OID" => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        "FLOAT4" | "FLOAT8" => text
            .parse::<f64>()
            .ok()
            .and_then(float_value)
            .unwrap_or_else(|| Value::String(text.to_string())),
        "JSON" | "JSONB" => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
        _ => Value::String(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_values() {
        assert_eq!(text_value("BOOL", "t"), json!(true));
        assert_eq!(text_value("BOOL", "f"), json!(false));
        assert_eq!(text_value("INT4", "275"), json!(275));
        assert_eq!(text_value("INT8", "-9000000000"), json!(-9_000_000_000i64));
        assert_eq!(text_value("FLOAT8", "0.99"), json!(0.99));
        assert_eq!(text_value("FLOAT8", "Infinity"), json!("Infinity"));
        assert_eq!(text_value("FLOAT4", "-Infinity"), json!("-Infinity"));
        assert_eq!(text_value("FLOAT8", "NaN"), json!("NaN"));
        assert_eq!(text_value("NUMERIC", "1.10"), json!("1.10"));
        assert_eq!(text_value("JSONB", r#"{"a": [1]}"#), json!({ "a": [1] }));
        assert_eq!(text_value("BYTEA", r"\x0aff"), json!(r"\x0aff"));
        assert_eq!(text_value("TEXT", "AC/DC"), json!("AC/DC"));
    }

    #[test]
    fn test_connect_timeout_from_string_wins() {
        let connector =
            PostgresConnector::new("host=localhost connect_timeout=2", Duration::from_secs(10)).unwrap();
        assert_eq!(connector.connect_timeout, Duration::from_secs(2));

        let connector = PostgresConnector::new("host=localhost", Duration::from_secs(10)).unwrap();
        assert_eq!(connector.connect_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_connection_error() {
        let connector = PostgresConnector::new(
            "host=127.0.0.1 port=1 user=postgres dbname=postgres sslmode=disable",
            Duration::from_secs(5),
        )
        .unwrap();
        let err = connector.execute("SELECT 1", 10).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::DatabaseConnection(_) | AppError::ConnectTimeout(_)
        ));
    }
}
