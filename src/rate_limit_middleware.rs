// src/rate_limit_middleware.rs
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

const WINDOW: Duration = Duration::from_secs(15 * 60);
const MAX_REQUESTS: u32 = 1000;

#[derive(Serialize)]
struct RateLimitErrorResponse {
    error: String,
    code: String,
    retry_after: u64,
}

/// Fixed-window request counter keyed by client IP.
///
/// Windows reset in place on first request after expiry, so the map only
/// grows with the number of distinct clients seen.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

enum Verdict {
    Allowed,
    Limited { retry_after: u64 },
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn check(&self, identifier: &str) -> Verdict {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();
        let entry = windows
            .entry(identifier.to_string())
            .or_insert_with(|| (now, 0));

        if now.duration_since(entry.0) >= WINDOW {
            *entry = (now, 0);
        }

        if entry.1 >= MAX_REQUESTS {
            let remaining = WINDOW.saturating_sub(now.duration_since(entry.0));
            return Verdict::Limited {
                retry_after: remaining.as_secs().max(1),
            };
        }

        entry.1 += 1;
        Verdict::Allowed
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract IP address from request
fn extract_ip_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    // X-Forwarded-For first, for proxied requests; take the first hop
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    connect_info.map(|info| info.0.ip().to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    Extension(limiter): Extension<Arc<RateLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip_address = extract_ip_address(request.headers(), connect_info.as_ref());
    let identifier = ip_address.clone().unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&identifier) {
        Verdict::Allowed => Ok(next.run(request).await),
        Verdict::Limited { retry_after } => {
            warn!(
                ip = %identifier,
                path = %request.uri().path(),
                retry_after = retry_after,
                "Request blocked by rate limiter"
            );

            let error_response = RateLimitErrorResponse {
                error: "Too many requests, please try again later.".to_string(),
                code: "RATE_LIMIT_EXCEEDED".to_string(),
                retry_after,
            };

            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();

            if let Ok(retry_header) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("retry-after", retry_header);
            }

            Err(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        let ip = extract_ip_address(&headers, None);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        let ip = extract_ip_address(&headers, None);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_none_without_headers_or_socket() {
        let headers = HeaderMap::new();
        assert_eq!(extract_ip_address(&headers, None), None);
    }

    #[test]
    fn test_limiter_blocks_after_max_requests() {
        let limiter = RateLimiter::new();
        for _ in 0..MAX_REQUESTS {
            assert!(matches!(limiter.check("203.0.113.1"), Verdict::Allowed));
        }
        assert!(matches!(
            limiter.check("203.0.113.1"),
            Verdict::Limited { .. }
        ));
    }

    #[test]
    fn test_limiter_tracks_clients_independently() {
        let limiter = RateLimiter::new();
        for _ in 0..MAX_REQUESTS {
            limiter.check("203.0.113.1");
        }
        assert!(matches!(limiter.check("203.0.113.2"), Verdict::Allowed));
    }
}
