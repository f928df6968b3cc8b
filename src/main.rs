mod admin;
mod auth;
mod config;
mod error;
mod guard;
mod logger;
mod metrics;
mod utils;

#[cfg(test)]
mod test_support;

use auth::{resolve_login, AccountDirectory, InMemoryAccountDirectory};
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use crate::config::Config;
use guard::{spawn_sweeper, LoginAttemptGuard, SystemClock};
use logger::LoggerConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

// 统一的应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub login_guard: Arc<LoginAttemptGuard>,
    pub accounts: Arc<dyn AccountDirectory>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    let config = Config::load()?;

    logger::init_logger(LoggerConfig::from(&config.logging))?;
    tracing::info!("配置加载成功");
    tracing::info!("服务器地址: {}:{}", config.server.host, config.server.port);
    tracing::info!(
        "登录限流: 每 {} 分钟最多 {} 次，清理间隔 {} 秒",
        config.guard.window_minutes,
        config.guard.max_attempts,
        config.guard.sweep_interval_seconds
    );

    // 初始化组件
    let accounts = Arc::new(InMemoryAccountDirectory::new(config.accounts.clone()));
    tracing::info!("账户目录初始化完成，共 {} 个账户", accounts.len().await);

    let login_guard = Arc::new(LoginAttemptGuard::new(Arc::new(SystemClock)));
    let sweeper = spawn_sweeper(
        login_guard.clone(),
        Duration::from_secs(config.guard.sweep_interval_seconds),
    );

    let config = Arc::new(config);
    let app_state = AppState {
        config: config.clone(),
        login_guard,
        accounts,
    };

    let app = build_router(app_state);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 登录守卫服务启动成功: http://{}", addr);
    tracing::info!("📝 身份解析接口: POST http://{}/api/auth/resolve-login", addr);
    tracing::info!("🔧 管理接口: http://{}/admin/login-attempts (仅localhost)", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.shutdown().await;
    tracing::info!("服务已停止");

    Ok(())
}

/// 构建路由
pub fn build_router(app_state: AppState) -> Router {
    // 公开路由
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/resolve-login", post(resolve_login));

    // 管理路由（只允许 localhost 访问）
    let admin_routes = Router::new()
        .route(
            "/admin/login-attempts",
            get(admin::get_attempts).delete(admin::reset_attempts),
        )
        .route("/admin/metrics", get(admin::metrics))
        .layer(middleware::from_fn(admin::localhost_only));

    public_routes
        .merge(admin_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听 Ctrl+C 信号: {}", e);
        return;
    }
    tracing::info!("收到关闭信号，正在停止服务...");
}
