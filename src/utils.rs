use axum::http::HeaderMap;
use std::net::SocketAddr;

/// 解析客户端地址
///
/// 信任代理头时依次取 X-Forwarded-For 最后一项（代理追加的那一跳）、X-Real-IP，
/// 否则用连接的对端地址。前面的项由客户端自己写入，不能作为限流 key。
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 登录限流的 key：login:{ip}:{用户名或邮箱，小写}
pub fn login_identifier(ip: &str, login: &str) -> String {
    format!("login:{}:{}", ip, login.trim().to_lowercase())
}
