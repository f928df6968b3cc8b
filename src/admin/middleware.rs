use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::error::AppError;

/// 中间件：只允许 loopback 地址访问管理接口
///
/// 这里只看 TCP 对端地址，不看 X-Forwarded-For。
pub async fn localhost_only(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if !addr.ip().is_loopback() {
        tracing::warn!("拒绝非 localhost 的管理请求，来源: {}", addr);
        return AppError::Forbidden("Admin API only accessible from localhost".to_string())
            .into_response();
    }

    tracing::debug!("允许来自 localhost 的管理请求: {}", addr);
    next.run(request).await
}
