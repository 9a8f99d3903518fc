//! SQL query models.
//!
//! Contains models for SQL query execution.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::connection::DbType;

/// Request body for executing a SQL query.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QueryRequest {
    /// Database type (`sqlite3` or `postgres`).
    #[serde(default)]
    pub db_type: DbType,

    /// Driver connection string. Empty means `:memory:` for SQLite.
    #[serde(default)]
    pub connection: String,

    /// SQL statement(s) to execute.
    #[validate(length(min = 1, message = "SQL statement is required"))]
    pub sql: String,

    /// Maximum number of rows to return (defaults to the service limit).
    #[serde(default)]
    #[validate(range(min = 1, message = "Limit must be at least 1"))]
    pub limit: Option<u32>,
}

impl QueryRequest {
    /// Creates a request with no explicit row limit.
    pub fn new(db_type: DbType, connection: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            db_type,
            connection: connection.into(),
            sql: sql.into(),
            limit: None,
        }
    }
}

/// Result of a SQL query execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct QueryResult {
    /// Whether the last statement described a result set.
    pub has_result_set: bool,

    /// Column information.
    pub columns: Vec<ColumnInfo>,

    /// Row data (each row is a vector of JSON values).
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Number of rows returned.
    #[serde(default)]
    pub row_count: usize,

    /// Whether rows past the limit were dropped.
    #[serde(default)]
    pub truncated: bool,

    /// Number of rows affected (for INSERT/UPDATE/DELETE).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,

    /// Query execution time in milliseconds.
    #[serde(default)]
    pub execution_time_ms: u64,

    /// Leading keyword of the last statement in the script.
    #[serde(default)]
    pub statement: String,
}

/// Column information in query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Column data type as reported by the driver.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a column description from a name and a driver type name.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

impl QueryResult {
    /// Column names, or `None` when there is no result set to show.
    pub fn headers(&self) -> Option<Vec<&str>> {
        if !self.has_result_set || self.columns.is_empty() {
            return None;
        }
        Some(self.columns.iter().map(|c| c.name.as_str()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sql_is_rejected() {
        let req = QueryRequest::new(DbType::Sqlite3, "", "");
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let mut req = QueryRequest::new(DbType::Sqlite3, "", "SELECT 1");
        req.limit = Some(0);
        assert!(req.validate().is_err());
        req.limit = Some(10);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: QueryRequest = serde_json::from_str(r#"{"sql": "SELECT 1"}"#).unwrap();
        assert_eq!(req.db_type, DbType::Sqlite3);
        assert!(req.connection.is_empty());
        assert!(req.limit.is_none());
    }

    #[test]
    fn test_headers_absent_without_result_set() {
        let result = QueryResult {
            affected_rows: Some(3),
            ..Default::default()
        };
        assert!(result.headers().is_none());

        let result = QueryResult {
            has_result_set: true,
            columns: vec![ColumnInfo::new("ArtistId", "INTEGER"), ColumnInfo::new("Name", "TEXT")],
            ..Default::default()
        };
        assert_eq!(result.headers(), Some(vec!["ArtistId", "Name"]));
    }
}
