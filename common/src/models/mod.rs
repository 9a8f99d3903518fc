//! Request and result models shared by the HTTP layer and the connectors.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{DbType, MEMORY_DATABASE};
pub use query::{ColumnInfo, QueryRequest, QueryResult};
