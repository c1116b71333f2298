//! Request and authentication audit logging.
//!
//! Bodies are never logged; authentication events carry the username only.

use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, warn};

/// Which credential operation an audit event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    Register,
    Login,
}

impl AuthEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::Register => "REGISTER",
            AuthEvent::Login => "LOGIN",
        }
    }
}

/// Best-effort client address: first `x-forwarded-for` hop, then `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    forwarded.or(real).unwrap_or("unknown").to_string()
}

/// Emit one audit record for a register/login attempt that took `elapsed`.
pub fn record(
    event: AuthEvent,
    username: &str,
    client_ip: &str,
    status: StatusCode,
    reason: Option<&str>,
    elapsed: Duration,
) {
    let username = if username.is_empty() { "unknown" } else { username };
    let status = status.as_u16();
    let duration_ms = elapsed.as_millis() as u64;
    if (200..300).contains(&status) {
        info!(
            target: "audit",
            event = event.as_str(),
            outcome = "SUCCESS",
            username,
            client_ip,
            status,
            duration_ms,
            "auth_event"
        );
    } else {
        info!(
            target: "audit",
            event = event.as_str(),
            outcome = "FAILED",
            username,
            client_ip,
            status,
            duration_ms,
            reason = reason.unwrap_or(""),
            "auth_event"
        );
    }
}

/// Middleware logging method, path, client and latency for every request.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let client_ip = client_ip(req.headers());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_millis() as u64;
    if status >= 500 {
        error!(%method, %path, status, %client_ip, %user_agent, duration_ms, "request failed");
    } else if status >= 400 {
        warn!(%method, %path, status, %client_ip, %user_agent, duration_ms, "request rejected");
    } else {
        info!(%method, %path, status, %client_ip, %user_agent, duration_ms, "request completed");
    }
    response
}
