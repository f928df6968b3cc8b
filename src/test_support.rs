use crate::auth::{Account, AccountStatus, InMemoryAccountDirectory};
use crate::config::Config;
use crate::guard::{LoginAttemptGuard, ManualClock};
use crate::{build_router, AppState};
use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::Request,
    response::Response,
    Router,
};
use chrono::{TimeZone, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

fn test_config(trust_forwarded_headers: bool) -> Config {
    Config::from_toml_str(&format!(
        "[server]\nhost = \"127.0.0.1\"\nport = 0\ntrust_forwarded_headers = {}\n",
        trust_forwarded_headers
    ))
    .expect("test config parses")
}

fn accounts() -> Vec<Account> {
    vec![
        Account {
            id: "acc_alice".to_string(),
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            name: Some("Alice Admin".to_string()),
            status: AccountStatus::Active,
        },
        Account {
            id: "acc_dave".to_string(),
            email: "dave@example.com".to_string(),
            username: "dave".to_string(),
            name: None,
            status: AccountStatus::Inactive,
        },
    ]
}

/// 对端地址 1.2.3.4 的测试应用
pub fn test_app() -> (Router, AppState, Arc<ManualClock>) {
    test_app_with_peer([1, 2, 3, 4])
}

pub fn test_app_with_peer(peer: [u8; 4]) -> (Router, AppState, Arc<ManualClock>) {
    build_test_app(peer, false)
}

/// 部署在反向代理之后（信任 X-Forwarded-For），代理的地址为 1.2.3.4
pub fn test_app_behind_proxy() -> (Router, AppState, Arc<ManualClock>) {
    build_test_app([1, 2, 3, 4], true)
}

fn build_test_app(peer: [u8; 4], trust_forwarded_headers: bool) -> (Router, AppState, Arc<ManualClock>) {
    let config = test_config(trust_forwarded_headers);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
    ));

    let state = AppState {
        config: Arc::new(config),
        login_guard: Arc::new(LoginAttemptGuard::new(clock.clone())),
        accounts: Arc::new(InMemoryAccountDirectory::new(accounts())),
    };

    let app = build_router(state.clone()).layer(MockConnectInfo(SocketAddr::from((peer, 40000))));
    (app, state, clock)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    forwarded_for: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(ip) = forwarded_for {
        builder = builder.header("x-forwarded-for", ip);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
