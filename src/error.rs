use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("禁止访问: {0}")]
    Forbidden(String),

    #[error("登录尝试过于频繁，{retry_after} 秒后重试")]
    RateLimited { retry_after: u64 },

    #[error("内部错误: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::RateLimited { retry_after } => {
                let body = Json(json!({
                    "error": "Too many login attempts. Please try again later.",
                    "retryAfter": retry_after
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                return response;
            }
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

// 请求体解析失败统一返回 400 + JSON 错误体
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(status = %rejection.status(), "请求体解析失败: {}", rejection.body_text());
        AppError::BadRequest(rejection.body_text())
    }
}

// anyhow::Error 统一转换为 InternalError，错误链只写日志不返回给客户端
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let error_chain = err
            .chain()
            .enumerate()
            .map(|(i, e)| format!("  [{}] {}", i, e))
            .collect::<Vec<_>>()
            .join("\n");

        tracing::error!(error = %err, chain = %error_chain, "anyhow::Error 被转换为 InternalError");

        AppError::InternalError("Internal server error".to_string())
    }
}
