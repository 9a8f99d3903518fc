//! Database type model.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// SQLite target used when no connection string is given.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Database type enumeration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum DbType {
    /// SQLite3 database file or in-memory database.
    #[default]
    #[serde(rename = "sqlite3", alias = "sqlite")]
    Sqlite3,
    /// PostgreSQL server.
    #[serde(rename = "postgres", alias = "postgresql")]
    Postgres,
}

impl DbType {
    /// All supported types, in the order they are offered to the user.
    pub const ALL: [DbType; 2] = [DbType::Sqlite3, DbType::Postgres];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Sqlite3 => "sqlite3",
            DbType::Postgres => "postgres",
        }
    }

    /// Connection string to use when the user left the field empty.
    ///
    /// SQLite falls back to an in-memory database. PostgreSQL keeps the
    /// empty string so that libpq environment defaults apply.
    pub fn default_connection(&self) -> &'static str {
        match self {
            DbType::Sqlite3 => MEMORY_DATABASE,
            DbType::Postgres => "",
        }
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite3" | "sqlite" => Ok(DbType::Sqlite3),
            "postgres" | "postgresql" | "pg" => Ok(DbType::Postgres),
            other => Err(AppError::UnsupportedDatabaseType(other.to_string())),
        }
    }
}
