//! Application error type.
//!
//! Every failure reaching the HTTP layer is an [`AppError`]. The driver's
//! own message is kept verbatim; [`AppError::user_message`] gives the short
//! text shown to the user.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

const CONNECTION_HINT: &str = "Error! Try to check your connection settings.";
const QUERY_HINT: &str = "Error! Try to check your sql query.";

/// Errors raised while serving a query.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request itself is invalid.
    #[error("validation error: {0}")]
    Validation(String),

    /// The database could not be reached or the connection string is wrong.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// Opening the connection took longer than allowed.
    #[error("database connection timed out after {0}s")]
    ConnectTimeout(u64),

    /// The statement failed to execute or commit.
    #[error("database query error: {0}")]
    DatabaseQuery(String),

    /// Unknown database type name.
    #[error("unsupported database type: {0}")]
    UnsupportedDatabaseType(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DatabaseConnection(_) => "CONNECTION_ERROR",
            AppError::ConnectTimeout(_) => "CONNECTION_TIMEOUT",
            AppError::DatabaseQuery(_) => "QUERY_ERROR",
            AppError::UnsupportedDatabaseType(_) => "UNSUPPORTED_DATABASE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UnsupportedDatabaseType(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::DatabaseQuery(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseConnection(_) => StatusCode::BAD_GATEWAY,
            AppError::ConnectTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message shown in the message box.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::DatabaseConnection(_) | AppError::ConnectTimeout(_) => {
                CONNECTION_HINT.to_string()
            }
            AppError::DatabaseQuery(_) => QUERY_HINT.to_string(),
            AppError::UnsupportedDatabaseType(name) => {
                format!("Unsupported database type: {}", name)
            }
            AppError::Internal(_) => "Internal error.".to_string(),
        }
    }

    /// Underlying driver text, when the error came from a database driver.
    pub fn driver_error(&self) -> Option<&str> {
        match self {
            AppError::DatabaseConnection(msg) | AppError::DatabaseQuery(msg) => Some(msg),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.driver_error() {
            Some(driver_error) => ApiResponse::err_with_details(
                self.code(),
                self.user_message(),
                json!({ "driver_error": driver_error }),
            ),
            None => ApiResponse::err(self.code(), self.user_message()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        AppError::Validation(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_share_hint() {
        let refused = AppError::DatabaseConnection("connection refused".into());
        let timeout = AppError::ConnectTimeout(10);
        assert_eq!(refused.user_message(), CONNECTION_HINT);
        assert_eq!(timeout.user_message(), CONNECTION_HINT);
        assert_eq!(refused.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_query_error_keeps_driver_text() {
        let err = AppError::DatabaseQuery("near \"SELEC\": syntax error".into());
        assert_eq!(err.user_message(), QUERY_HINT);
        assert_eq!(err.driver_error(), Some("near \"SELEC\": syntax error"));
        assert_eq!(err.code(), "QUERY_ERROR");
    }

    #[test]
    fn test_validation_has_no_driver_error() {
        let err = AppError::Validation("SQL statement is required".into());
        assert_eq!(err.user_message(), "SQL statement is required");
        assert!(err.driver_error().is_none());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_into_response_carries_details() {
        let response = AppError::DatabaseQuery("no such table: Artist".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "QUERY_ERROR");
        assert_eq!(body["error"]["details"]["driver_error"], "no such table: Artist");
    }
}
