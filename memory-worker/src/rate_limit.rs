//! Per-IP rate limiting on `/api/*` (§4.7: 200 req/min/IP).
//!
//! `tower-http` ships compression/CORS/trace/body-limit layers but no rate
//! limiter, and nothing else in the corpus does IP-keyed limiting, so this
//! is a small sliding-window counter built from the crates already in the
//! stack (`parking_lot`, no new dependency) rather than reaching for an
//! ungrounded crate.

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);
const LIMIT_PER_WINDOW: usize = 200;

/// A per-IP sliding window of recent request timestamps.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let entries = windows.entry(ip).or_default();
        entries.retain(|t| now.duration_since(*t) < WINDOW);
        if entries.len() >= LIMIT_PER_WINDOW {
            return false;
        }
        entries.push(now);
        true
    }
}

/// Middleware entry point: `axum::middleware::from_fn_with_state`.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    if limiter.check(addr.ip()) {
        next.run(request).await
    } else {
        (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..LIMIT_PER_WINDOW {
            assert!(limiter.check(ip));
        }
        assert!(!limiter.check(ip));
    }

    #[test]
    fn different_ips_have_independent_windows() {
        let limiter = RateLimiter::new();
        let a: IpAddr = "127.0.0.1".parse().unwrap();
        let b: IpAddr = "127.0.0.2".parse().unwrap();
        for _ in 0..LIMIT_PER_WINDOW {
            assert!(limiter.check(a));
        }
        assert!(limiter.check(b));
    }
}
