//! Fixed-window rate limiting per client address.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::GatewayError;
use crate::observability::metrics;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Result of recording one hit against a client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Hits in the current window, including this one.
    pub count: u32,
    /// Time until the window resets.
    pub resets_in: Duration,
}

/// Counter storage behind the limiter.
///
/// The limiter only talks to this trait, so a shared store can replace the
/// in-process one without touching the middleware.
pub trait RateLimitStore: Send + Sync + 'static {
    /// Count a hit for `key` at `now` and report the window state.
    fn hit(&self, key: &str, now: Instant) -> WindowHit;

    /// Drop windows that have fully elapsed at `now`.
    fn prune(&self, _now: Instant) {}
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Process-local store. Counters are lost on restart.
pub struct MemoryStore {
    windows: DashMap<String, Window>,
    window: Duration,
}

impl MemoryStore {
    pub fn new(window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            window,
        }
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl RateLimitStore for MemoryStore {
    fn hit(&self, key: &str, now: Instant) -> WindowHit {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { started: now, count: 0 });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }
        entry.count = entry.count.saturating_add(1);

        WindowHit {
            count: entry.count,
            resets_in: self.window.saturating_sub(now.duration_since(entry.started)),
        }
    }

    fn prune(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub resets_in: Duration,
}

/// Allows at most `max_requests` per client per window.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    /// A limiter over a fresh [`MemoryStore`].
    pub fn in_memory(config: &RateLimitConfig) -> Self {
        let window = Duration::from_secs(config.window_secs);
        Self::new(Arc::new(MemoryStore::new(window)), config.max_requests, window)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, key: &str, now: Instant) -> Decision {
        let hit = self.store.hit(key, now);
        Decision {
            allowed: hit.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(hit.count),
            resets_in: hit.resets_in,
        }
    }

    pub fn prune(&self, now: Instant) {
        self.store.prune(now);
    }
}

/// Middleware applying the limiter keyed by peer IP.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let decision = limiter.check(&key, Instant::now());

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, limit = decision.limit, "Rate limit exceeded");
        metrics::record_rate_limited();
        // Round up so clients never retry before the window resets.
        let retry_after_secs = decision.resets_in.as_secs()
            + u64::from(decision.resets_in.subsec_nanos() > 0);
        GatewayError::RateLimited { retry_after_secs }.into_response()
    };

    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    response
}
