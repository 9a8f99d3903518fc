//! Handler模块

use axum::{
    extract::State,
    response::Html,
    Extension, Form, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::middleware::RequestId;
use common::models::query::{QueryRequest, QueryResult};
use common::models::DbType;
use common::response::ApiResponse;
use crate::page::{self, LaunchForm, Notice, NO_RESULT_MESSAGE};
use crate::service::QueryService;
use crate::state::AppState;
use crate::SERVICE_NAME;

fn query_service(state: &AppState) -> QueryService {
    QueryService::new(state.connectors.clone(), state.config.max_rows)
}

/// 执行 SQL 查询
#[utoipa::path(
    post,
    path = "/api/query",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "查询执行成功", body = ApiResponse<QueryResult>),
        (status = 400, description = "SQL 无效或校验错误"),
        (status = 502, description = "无法连接数据库"),
        (status = 504, description = "连接数据库超时")
    )
)]
pub async fn execute_query(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<ApiResponse<QueryResult>>, AppError> {
    let result = query_service(&state).execute(req).await?;
    Ok(Json(
        ApiResponse::ok_with_service(result, SERVICE_NAME).with_request_id(request_id.as_str()),
    ))
}

/// 连接表单页面
pub async fn index() -> Html<String> {
    Html(page::render(&LaunchForm::default(), None, None))
}

/// 提交表单并展示查询结果
pub async fn launch(State(state): State<AppState>, Form(form): Form<LaunchForm>) -> Html<String> {
    let db_type = match form.db_type.parse::<DbType>() {
        Ok(db_type) => db_type,
        Err(e) => {
            let notice = Notice::new(e.user_message(), None);
            return Html(page::render(&form, None, Some(&notice)));
        }
    };

    let req = QueryRequest::new(db_type, form.connection.clone(), form.query.clone());
    match query_service(&state).execute(req).await {
        Ok(result) if result.headers().is_some() => Html(page::render(&form, Some(&result), None)),
        Ok(result) => {
            let detail = result
                .affected_rows
                .map(|n| format!("{} row(s) affected.", n));
            let notice = Notice::new(NO_RESULT_MESSAGE, detail);
            Html(page::render(&form, None, Some(&notice)))
        }
        Err(e) => {
            let notice = Notice::new(e.user_message(), e.driver_error().map(str::to_string));
            Html(page::render(&form, None, Some(&notice)))
        }
    }
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        databases: DbType::ALL.to_vec(),
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 支持的数据库类型
    pub databases: Vec<DbType>,
}
