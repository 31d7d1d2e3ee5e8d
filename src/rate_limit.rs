//! Per-client submission throttling
//!
//! Each client key may have one admitted submission per throttle window.
//! Stale entries are pruned on every call, so the map never outgrows the
//! set of clients seen within one window and no timer is needed.
//!
//! # Client keys
//!
//! [`client_key`] prefers the first address in `X-Forwarded-For` and falls
//! back to the TCP peer address. The header is client-controlled: anyone can
//! send a fresh value per request and dodge the limit. That is only
//! acceptable when the service sits behind a reverse proxy that overwrites
//! the header. Without such a proxy the limit is advisory only.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

pub const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    /// Last admitted submission per client key
    last_admitted: Mutex<HashMap<String, DateTime<Utc>>>,
    window: chrono::Duration,
    window_std: Duration,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                last_admitted: Mutex::new(HashMap::new()),
                window: chrono::Duration::from_std(window)
                    .unwrap_or_else(|_| chrono::Duration::days(365)),
                window_std: window,
            }),
        }
    }

    /// The throttle window, as reported to rejected clients
    pub fn window(&self) -> Duration {
        self.inner.window_std
    }

    /// Decide whether `key` may submit at `now`.
    ///
    /// A rejected call leaves the client's timestamp untouched, so retrying
    /// early does not push the next allowed time further out.
    pub fn admit(&self, key: &str, now: DateTime<Utc>) -> bool {
        let window = self.inner.window;
        let mut entries = self.inner.last_admitted.lock();

        entries.retain(|_, last| now - *last <= window);

        if let Some(last) = entries.get(key) {
            if now - *last < window {
                tracing::debug!(client = %key, last_admitted = %last, "Submission throttled");
                return false;
            }
        }

        entries.insert(key.to_string(), now);
        true
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.inner.last_admitted.lock().len()
    }
}

/// Derive the throttling key for a request.
pub fn client_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}
