//! 查询执行服务模块

use std::sync::Arc;
use std::time::Instant;

use validator::Validate;

use common::errors::{AppError, AppResult};
use common::models::query::{QueryRequest, QueryResult};
use common::utils::SqlClassifier;
use crate::connector::ConnectorFactory;

/// SQL 查询执行服务
pub struct QueryService {
    connectors: Arc<ConnectorFactory>,
    max_rows: u32,
}

impl QueryService {
    /// 创建新的查询服务实例
    pub fn new(connectors: Arc<ConnectorFactory>, max_rows: u32) -> Self {
        Self {
            connectors,
            max_rows,
        }
    }

    /// 执行 SQL 查询
    pub async fn execute(&self, req: QueryRequest) -> AppResult<QueryResult> {
        req.validate()?;
        if SqlClassifier::is_blank(&req.sql) {
            return Err(AppError::Validation("SQL statement is required".into()));
        }

        let limit = req.limit.map_or(self.max_rows, |l| l.min(self.max_rows));
        let connection = match req.connection.trim() {
            "" => req.db_type.default_connection(),
            given => given,
        };
        let statement = SqlClassifier::leading_keyword(SqlClassifier::last_statement(&req.sql));

        let start = Instant::now();
        let outcome = match self.connectors.get_connector(req.db_type, connection) {
            Ok(connector) => {
                tracing::debug!(db_type = %connector.db_type(), statement = %statement, limit, "执行查询");
                connector.execute(&req.sql, limit as usize).await
            }
            Err(e) => Err(e),
        };
        let execution_time_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                let result = output.into_result(statement, execution_time_ms);
                tracing::info!(
                    db_type = %req.db_type,
                    statement = %result.statement,
                    rows = result.row_count,
                    truncated = result.truncated,
                    elapsed_ms = execution_time_ms,
                    "查询执行完成"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(
                    db_type = %req.db_type,
                    statement = %statement,
                    code = e.code(),
                    error = %e,
                    "查询执行失败"
                );
                Err(e)
            }
        }
    }
}
