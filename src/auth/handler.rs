use crate::{error::AppError, metrics::METRICS, utils, AppState};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use super::{Account, AccountStatus};

#[derive(Debug, Deserialize)]
pub struct ResolveLoginRequest {
    /// 用户名或邮箱
    pub login: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveLoginResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub status: AccountStatus,
}

impl From<Account> for ResolveLoginResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            username: account.username,
            name: account.name,
            status: account.status,
        }
    }
}

/// 解析登录身份（真正的密码校验在别处）
///
/// 失败的查找会额外调用 `record_failed_attempt`，因此一次失败请求计两次。
pub async fn resolve_login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<ResolveLoginRequest>, JsonRejection>,
) -> Result<Json<ResolveLoginResponse>, AppError> {
    let Json(req) = payload?;
    let login = req.login.trim();
    if login.is_empty() {
        return Err(AppError::BadRequest("Username or email is required".to_string()));
    }

    let ip = utils::client_ip(&headers, Some(peer), state.config.server.trust_forwarded_headers);
    let identifier = utils::login_identifier(&ip, login);
    let policy = state.config.guard.policy();

    // 1. 限流检查（同时计入本次尝试）
    if state.login_guard.is_limited(&identifier, &policy) {
        let retry_after = state.login_guard.time_until_reset(&identifier);
        METRICS.login_rate_limited.inc();
        METRICS.record_lookup("limited");
        tracing::warn!("登录查找被限流: ip={}, 剩余 {} 秒", ip, retry_after);
        return Err(AppError::RateLimited { retry_after });
    }

    // 2. 查找账户
    let account = match state.accounts.find_by_login(login).await {
        Ok(account) => account,
        Err(e) => {
            METRICS.record_lookup("error");
            return Err(e.context("查询账户失败").into());
        }
    };

    let Some(account) = account else {
        state.login_guard.record_failed_attempt(&identifier, &policy);
        METRICS.record_lookup("not_found");
        tracing::info!("登录查找失败（账户不存在）: ip={}", ip);
        return Err(AppError::NotFound("User not found".to_string()));
    };

    if !account.is_active() {
        state.login_guard.record_failed_attempt(&identifier, &policy);
        METRICS.record_lookup("inactive");
        tracing::info!("登录查找失败（账户未激活）: ip={}, 用户={}", ip, account.username);
        return Err(AppError::Forbidden("Account is inactive".to_string()));
    }

    METRICS.record_lookup("found");
    METRICS.guard_entries.set(state.login_guard.ledger().len() as i64);
    tracing::debug!("登录查找成功: ip={}, 用户={}", ip, account.username);

    Ok(Json(account.into()))
}
