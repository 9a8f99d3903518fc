//! 数据库连接器
//!
//! Each execution opens its own connection, runs the query text inside a
//! transaction, commits and closes the connection again.

mod dsn;
mod output;
mod postgres;
mod sqlite;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::Connection;

use common::errors::{AppError, AppResult};
use common::models::DbType;

pub use output::StatementOutput;
use postgres::PostgresConnector;
use sqlite::SqliteConnector;

/// A database the service can run queries against.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Database type served by this connector.
    fn db_type(&self) -> DbType;

    /// Runs `query` and returns the output of its last statement,
    /// keeping at most `max_rows` rows.
    async fn execute(&self, query: &str, max_rows: usize) -> AppResult<StatementOutput>;
}

/// Builds connectors from a database type and a connection string.
#[derive(Debug, Clone)]
pub struct ConnectorFactory {
    connect_timeout: Duration,
}

impl ConnectorFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Parses the connection string for `db_type`.
    ///
    /// A malformed string is reported as a connection error.
    pub fn get_connector(&self, db_type: DbType, connection: &str) -> AppResult<Box<dyn Connector>> {
        match db_type {
            DbType::Sqlite3 => Ok(Box::new(SqliteConnector::new(connection, self.connect_timeout)?)),
            DbType::Postgres => Ok(Box::new(PostgresConnector::new(connection, self.connect_timeout)?)),
        }
    }
}

/// Awaits a driver connect future, bounded by `timeout`.
async fn connect_within<C, F>(timeout: Duration, connecting: F) -> AppResult<C>
where
    F: Future<Output = Result<C, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, connecting).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(AppError::DatabaseConnection(e.to_string())),
        Err(_) => Err(AppError::ConnectTimeout(timeout.as_secs())),
    }
}

async fn close_connection<C: Connection>(conn: C) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "Failed to close database connection");
    }
}

fn query_error(e: sqlx::Error) -> AppError {
    AppError::DatabaseQuery(e.to_string())
}
