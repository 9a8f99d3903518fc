//! SQL 连接器服务
//!
//! 提供浏览器表单与 JSON 接口，包括：
//! - 输入连接字符串并选择数据库类型（sqlite3 / postgres）
//! - 执行 SQL 查询
//! - 以表格展示结果集，失败时展示错误信息

mod connector;
mod handlers;
mod page;
mod routes;
mod service;
mod state;

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

pub(crate) const SERVICE_NAME: &str = "connector-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SQL 连接器 API",
        version = "0.1.0",
        description = "连接 SQLite3/PostgreSQL 执行 SQL 查询"
    ),
    paths(
        handlers::execute_query,
        handlers::health_check,
    ),
    components(schemas(
        common::models::QueryRequest,
        common::models::QueryResult,
        common::models::ColumnInfo,
        common::models::DbType,
        handlers::HealthResponse,
    )),
    tags(
        (name = "query", description = "查询执行端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 文件可选
    let _ = dotenvy::dotenv();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 初始化日志追踪
    init_tracing(&config)?;

    // 创建应用状态
    let state = AppState::new(config.clone());

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = config.bind_address();
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

/// stdout 日志，另可追加写入日志文件（LOG_FILE）
fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("无法打开日志文件: {}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = AppConfig {
            service_name: SERVICE_NAME.to_string(),
            log_file: None,
            ..Default::default()
        };
        create_router(AppState::new(config))
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post_form(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let html = body_text(response).await;
        assert!(html.contains("SQL Connector"));
        assert!(html.contains("Launch"));
    }

    #[tokio::test]
    async fn test_launch_renders_result_table() {
        let response = app()
            .oneshot(post_form(
                "connection=%3Amemory%3A&db_type=sqlite3&query=SELECT+1+AS+one%2C+%27AC%2FDC%27+AS+name",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<th>one</th><th>name</th>"));
        assert!(html.contains("<tr><td>1</td><td>AC/DC</td></tr>"));
    }

    #[tokio::test]
    async fn test_launch_without_result_set_shows_message() {
        let response = app()
            .oneshot(post_form("connection=&db_type=sqlite3&query=CREATE+TABLE+t+%28a%29"))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("There is no result for your query."));
        assert!(!html.contains("<table>"));
    }

    #[tokio::test]
    async fn test_launch_bad_sql_shows_query_hint() {
        let response = app()
            .oneshot(post_form("connection=&db_type=sqlite3&query=SELEC+1"))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("Error! Try to check your sql query."));
        assert!(html.contains("SELEC 1"));
    }

    #[tokio::test]
    async fn test_launch_bad_connection_shows_connection_hint() {
        let response = app()
            .oneshot(post_form("connection=host%3Dlocalhost+colour%3Dblue&db_type=postgres&query=SELECT+1"))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("Error! Try to check your connection settings."));
        assert!(html.contains("colour"));
    }

    #[tokio::test]
    async fn test_api_query_returns_envelope() {
        let response = app()
            .oneshot(post_json(json!({
                "db_type": "sqlite3",
                "connection": ":memory:",
                "sql": "SELECT 42 AS answer"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["columns"][0]["name"], "answer");
        assert_eq!(body["data"]["rows"], json!([[42]]));
        assert_eq!(body["meta"]["service"], SERVICE_NAME);
        assert!(body["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_api_query_error_status() {
        let response = app()
            .oneshot(post_json(json!({ "db_type": "sqlite3", "sql": "" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_openapi_lists_query_path() {
        let response = app()
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["paths"]["/api/query"].is_object());
    }
}
