// src/utils/rate_limit.rs

//! Per-client request limiting.
//!
//! Best-effort and process-local: counters live in memory and reset on
//! restart. The limiter is owned by `AppState` rather than being a global.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, Quota,
    clock::{Clock, DefaultClock},
};

use crate::{config::Config, error::AppError};

/// Key used when a request carries no forwarded client address.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Outcome of a single limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

/// Keyed token-bucket limiter with a bound on tracked keys.
pub struct RateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
    clock: DefaultClock,
    max_keys: usize,
}

impl RateLimiter {
    pub fn new(per_minute: u32, burst: u32, max_keys: usize) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(per_minute);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            limiter: governor::RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            max_keys: max_keys.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.rate_limit_per_minute,
            config.rate_limit_burst,
            config.rate_limit_max_keys,
        )
    }

    pub fn check(&self, key: &str) -> Decision {
        self.evict_idle();

        match self.limiter.check_key(&key.to_string()) {
            Ok(()) => Decision::Allowed,
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                Decision::Limited {
                    retry_after_secs: wait.as_secs().max(1),
                }
            }
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    /// Drops keys whose bucket has fully refilled once the bound is reached.
    fn evict_idle(&self) {
        if self.tracked_keys() < self.max_keys {
            return;
        }
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        tracing::debug!(remaining = self.tracked_keys(), "Evicted idle rate limit keys");
    }
}

/// Client identity: first `X-Forwarded-For` hop, else a shared anonymous key.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(ANONYMOUS_KEY)
        .to_string()
}

/// Axum Middleware: rejects clients over quota with 429 and `Retry-After`.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(req.headers());

    match limiter.check(&key) {
        Decision::Allowed => next.run(req).await,
        Decision::Limited { retry_after_secs } => {
            tracing::warn!("Rate limit exceeded for {}", key);
            AppError::TooManyRequests { retry_after_secs }.into_response()
        }
    }
}
