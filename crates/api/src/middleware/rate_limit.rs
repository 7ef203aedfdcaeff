//! Fixed-window per-client rate limiting.
//!
//! Counters live in process memory; each window starts on the first request
//! from a client and resets after the configured duration. Limit headers are
//! attached to allowed responses, and rejections carry a `retryAfter` hint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::warn;

use crate::context::AppContext;

const HEADER_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const HEADER_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the current window resets.
    pub reset_after_secs: u64,
}

struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window counter keyed by client identifier.
pub struct RateLimiter {
    max: u32,
    window: Duration,
    buckets: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self { max, window, buckets: Mutex::new(HashMap::new()) }
    }

    /// Count a request from `key` and decide whether it is allowed.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();

        let window =
            buckets.entry(key.to_string()).or_insert_with(|| Window { count: 0, started: now });

        if now.duration_since(window.started) >= self.window {
            window.count = 0;
            window.started = now;
        }

        window.count += 1;
        let elapsed = now.duration_since(window.started);

        RateDecision {
            allowed: window.count <= self.max,
            limit: self.max,
            remaining: self.max.saturating_sub(window.count),
            reset_after_secs: self.window.saturating_sub(elapsed).as_secs(),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

/// Client key for rate limiting: proxy-forwarded address when present.
fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| "local".to_string())
}

fn reject(limiter: &RateLimiter, message: &str) -> Response {
    let body = serde_json::json!({
        "status": "error",
        "message": message,
        "retryAfter": limiter.window_secs(),
    });
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

fn attach_headers(response: &mut Response, decision: RateDecision) {
    let headers = response.headers_mut();
    headers.insert(HEADER_LIMIT, header_value(decision.limit.to_string()));
    headers.insert(HEADER_REMAINING, header_value(decision.remaining.to_string()));
    let reset = Utc::now() + chrono::Duration::seconds(decision.reset_after_secs as i64);
    headers.insert(HEADER_RESET, header_value(reset.to_rfc3339()));
}

fn header_value(value: String) -> HeaderValue {
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
}

/// Rate-limit middleware for webhook routes.
pub async fn webhook_rate_limit(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let key = format!("webhook:{}", client_key(&request));
    let decision = ctx.webhook_limiter.check(&key);

    if !decision.allowed {
        warn!(key = %key, uri = %request.uri(), "webhook rate limit exceeded");
        return reject(&ctx.webhook_limiter, "Too many webhook requests, please try again later.");
    }

    let mut response = next.run(request).await;
    attach_headers(&mut response, decision);
    response
}

/// Rate-limit middleware for the onboarding API.
pub async fn api_rate_limit(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let key = format!("api:{}", client_key(&request));
    let decision = ctx.api_limiter.check(&key);

    if !decision.allowed {
        warn!(key = %key, uri = %request.uri(), "api rate limit exceeded");
        return reject(&ctx.api_limiter, "Too many API requests, please try again later.");
    }

    let mut response = next.run(request).await;
    attach_headers(&mut response, decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check("1.2.3.4");
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let decision = limiter.check("1.2.3.4");
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);

        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check("a").allowed);
    }
}
