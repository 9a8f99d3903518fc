//! Shared building blocks for the SQL connector service.
//!
//! Holds configuration, the error type, the response envelope, middleware
//! and the request/result models used by the HTTP layer and the connectors.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
