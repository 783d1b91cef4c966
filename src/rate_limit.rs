// Per-client fixed-window rate limiting, one window per client key

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::metrics::{RATE_LIMITED_TOTAL, RATE_LIMIT_WINDOWS};
use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

// Rate limit entry - tracks requests per client key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorWindow {
    pub count: u32,
    pub window_start: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Denied { retry_after_secs: u64 },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit must be a positive integer")]
    InvalidLimit,
    #[error("rate limit window must be longer than zero")]
    InvalidWindow,
    #[error("x-forwarded-for header is not valid ascii")]
    MalformedForwardedFor,
}

pub struct RateLimiter {
    windows: DashMap<String, VisitorWindow>,
    limit: u32,
    window: Duration,
    disabled: bool,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            limit: config.limit,
            window: config.window,
            disabled: config.disabled,
        }
    }

    pub fn window_length(&self) -> Duration {
        self.window
    }

    /// Admission decision with the configured limit and window.
    pub fn admit(&self, key: &str, now: Instant) -> Admission {
        self.admit_with(key, now, self.limit, self.window)
    }

    /// Admission decision with per-call overrides. Bookkeeping faults never
    /// block a request: they are logged and resolved to [`Admission::Admitted`].
    pub fn admit_with(&self, key: &str, now: Instant, limit: u32, window: Duration) -> Admission {
        match self.try_admit(key, now, limit, window) {
            Ok(admission) => admission,
            Err(e) => {
                tracing::warn!(client = key, "Rate limiter fault, admitting request: {e}");
                Admission::Admitted
            }
        }
    }

    /// The bookkeeping step itself. The shard lock taken by `entry` is held
    /// across the check and the increment, so concurrent requests for the
    /// same key cannot both slip under the limit.
    pub fn try_admit(
        &self,
        key: &str,
        now: Instant,
        limit: u32,
        window: Duration,
    ) -> Result<Admission, RateLimitError> {
        if self.disabled {
            return Ok(Admission::Admitted);
        }
        if limit == 0 {
            return Err(RateLimitError::InvalidLimit);
        }
        if window.is_zero() {
            return Err(RateLimitError::InvalidWindow);
        }

        match self.windows.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(VisitorWindow { count: 1, window_start: now });
                Ok(Admission::Admitted)
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();

                // window expired..? start a new one
                if now.saturating_duration_since(entry.window_start) >= window {
                    entry.count = 1;
                    entry.window_start = now;
                    return Ok(Admission::Admitted);
                }

                if entry.count < limit {
                    entry.count += 1;
                    return Ok(Admission::Admitted);
                }

                let remaining = (entry.window_start + window).saturating_duration_since(now);
                Ok(Admission::Denied {
                    retry_after_secs: remaining.as_millis().div_ceil(1000) as u64,
                })
            }
        }
    }

    /// Drops windows that have fully elapsed. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let window = self.window;
        let before = self.windows.len();
        self.windows
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) < window);
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    #[cfg(test)]
    fn window(&self, key: &str) -> Option<VisitorWindow> {
        self.windows.get(key).map(|entry| *entry)
    }
}

/// Best-effort client identity: first forwarded address, then the peer
/// address, then `"unknown"`. The forwarded header is client-controlled
/// unless an edge proxy strips it.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> Result<String, RateLimitError> {
    if let Some(value) = headers.get(FORWARDED_FOR) {
        let value = value
            .to_str()
            .map_err(|_| RateLimitError::MalformedForwardedFor)?;
        if let Some(first) = value.split(',').next().map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(first.to_string());
        }
    }

    Ok(peer
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string()))
}

pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let key = match client_key(req.headers(), peer) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!("Rate limiter fault, admitting request: {e}");
            return next.run(req).await;
        }
    };

    match state.rate_limiter.admit(&key, Instant::now()) {
        Admission::Admitted => next.run(req).await,
        Admission::Denied { retry_after_secs } => {
            RATE_LIMITED_TOTAL.inc();
            tracing::info!(client = %key, retry_after_secs, "Rate limit exceeded");
            ApiError::RateLimited { retry_after_secs }.into_response()
        }
    }
}

/// Background sweep, one pass per window length.
pub async fn sweep_expired(limiter: std::sync::Arc<RateLimiter>) {
    let period = limiter.window_length().max(Duration::from_secs(1));
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;
        let purged = limiter.purge_expired(Instant::now());
        RATE_LIMIT_WINDOWS.set(limiter.tracked_keys() as f64);
        if purged > 0 {
            tracing::debug!(purged, remaining = limiter.tracked_keys(), "Purged expired rate limit windows");
        }
    }
}
