use crate::{error::AppError, guard::AttemptStatus, metrics::METRICS, AppState};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct IdentifierQuery {
    pub identifier: String,
}

/// 查看某个标识符的限流状态
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStatusResponse {
    pub identifier: String,
    #[serde(flatten)]
    pub status: AttemptStatus,
    pub max_attempts: u32,
    pub tracked_entries: usize,
}

/// 管理接口：查看限流状态（不消耗次数）
pub async fn get_attempts(
    State(state): State<AppState>,
    Query(query): Query<IdentifierQuery>,
) -> Result<Json<AttemptStatusResponse>, AppError> {
    let identifier = non_empty(query.identifier)?;
    let policy = state.config.guard.policy();
    let status = state.login_guard.peek(&identifier, &policy);

    Ok(Json(AttemptStatusResponse {
        identifier,
        status,
        max_attempts: policy.max_attempts,
        tracked_entries: state.login_guard.ledger().len(),
    }))
}

/// 管理接口：手动解除限流
pub async fn reset_attempts(
    State(state): State<AppState>,
    Query(query): Query<IdentifierQuery>,
) -> Result<StatusCode, AppError> {
    let identifier = non_empty(query.identifier)?;
    state.login_guard.reset(&identifier);
    METRICS.guard_entries.set(state.login_guard.ledger().len() as i64);
    tracing::info!("管理员重置登录限流: {}", identifier);
    Ok(StatusCode::NO_CONTENT)
}

/// 管理接口：Prometheus 指标
pub async fn metrics() -> Result<Response, AppError> {
    let body = METRICS
        .render()
        .map_err(|e| AppError::InternalError(format!("指标导出失败: {}", e)))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

fn non_empty(identifier: String) -> Result<String, AppError> {
    if identifier.trim().is_empty() {
        return Err(AppError::BadRequest("identifier is required".to_string()));
    }
    Ok(identifier)
}
