use axum::Router;
use com_exchange::{com::ComEngine, config, db, docs, router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() {
    // 加载配置(日志尚未初始化) / Load config before logging is up
    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ 配置加载失败 / Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // 初始化日志, 配置了目录时同时按天写文件
    // Initialize logging, also writing daily files when a directory is configured
    let (file_layer, _log_guard) = match config.logging.directory.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "com_exchange=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    tracing::info!("启动 COM Exchange / Starting COM Exchange...");
    tracing::info!("✅ 配置加载成功 / Config loaded: {:?}", config.com);

    // 初始化 RocksDB
    let db_storage = match db::RocksDbStorage::new(&config) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!("❌ RocksDB 初始化失败: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("✅ RocksDB 初始化成功");

    let engine = Arc::new(ComEngine::new(db_storage.db(), config.com.clone()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_router = router::create_router(engine);

    let swagger_ui = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", docs::ApiDoc::openapi());

    // 组合所有路由 / Combine all routes
    let app = Router::new()
        .merge(swagger_ui)
        .merge(api_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("❌ 端口绑定失败 / Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("服务器启动成功！");
    tracing::info!("访问 http://localhost:{}/health 测试接口", config.server.port);
    tracing::info!("访问 http://localhost:{}/swagger-ui 查看 API 文档", config.server.port);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("❌ 服务器异常退出 / Server exited: {}", e);
        std::process::exit(1);
    }
}
