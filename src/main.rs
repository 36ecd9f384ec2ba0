use axum::{
    routing::{get, post},
    Router,
};
use invoice_extract_rust::api::{self, AppState};
use invoice_extract_rust::client::OpenAiClient;
use invoice_extract_rust::db::PgStore;
use invoice_extract_rust::{create_pool, AppConfig, ExtractionQueue, InvoiceProcessor};
use std::time::Duration;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置 (密钥不入日志)
    let config = AppConfig::from_env();
    info!(
        "Starting server on {}:{}, model {}",
        config.server.host, config.server.port, config.ai.model
    );

    // 创建数据库连接池并应用迁移
    let pool = create_pool(&config.database.url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database pool created, migrations applied");

    // 提取流水线: 客户端 -> 编排器 -> 任务队列
    let client = OpenAiClient::new(&config.ai)?;
    let processor = InvoiceProcessor::new(
        client,
        PgStore::new(pool.clone()),
        config.ai.model.clone(),
        Duration::from_secs(config.ai.timeout_secs),
    );
    let (queue, _worker) = ExtractionQueue::start(
        processor,
        config.worker.max_attempts,
        config.worker.retry_base_secs,
    );

    let state = AppState { pool, queue };

    // 构建路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .route(
            "/api/v1/invoices",
            get(api::list_invoices).post(api::create_invoice),
        )
        .route("/api/v1/invoices/:id", get(api::get_invoice))
        .route("/api/v1/accounts", post(api::create_account))
        .layer(ServiceBuilder::new())
        .with_state(state);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /api/v1/invoices      - latest invoices with lines and extractions");
    info!("  POST /api/v1/invoices      - submit invoice, enqueue extraction");
    info!("  GET  /api/v1/invoices/:id  - single invoice detail");
    info!("  POST /api/v1/accounts      - provision tenant account");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
