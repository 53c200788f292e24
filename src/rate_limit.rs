use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::AppError;

/// Fixed-window request limiter keyed by client IP.
///
/// Every request lands in the caller's current window; once the window is
/// older than the configured duration it resets on first touch. There is no
/// background sweeper: stale entries are recycled the next time the IP shows
/// up.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<RwLock<HashMap<IpAddr, WindowState>>>,
    max_requests: usize,
    window: Duration,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: usize,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            state: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Counts one request against the IP's window. Returns false when the
    /// window already holds `max_requests`.
    pub async fn check(&self, ip: IpAddr) -> bool {
        let mut state = self.state.write().await;
        let now = Instant::now();
        let entry = state.entry(ip).or_insert(WindowState {
            count: 0,
            window_start: now,
        });
        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.count += 1;
        entry.count <= self.max_requests
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    if !limiter.check(ip).await {
        warn!(%ip, "rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }
    Ok(next.run(request).await)
}

/// Client IP from X-Forwarded-For (first hop), then X-Real-IP, else loopback.
fn client_ip(request: &Request) -> IpAddr {
    if let Some(forwarded) = request.headers().get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first) = forwarded_str.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("X-Real-IP") {
        if let Ok(ip_str) = real_ip.to_str() {
            if let Ok(ip) = ip_str.parse::<IpAddr>() {
                return ip;
            }
        }
    }

    IpAddr::from([127, 0, 0, 1])
}
