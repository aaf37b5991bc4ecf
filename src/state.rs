use std::sync::Arc;

use crate::config::Config;
use crate::utils::{preview_cache::PreviewCache, rate_limit::RateLimiter};
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub rate_limiter: Arc<RateLimiter>,
    pub previews: PreviewCache,
}

impl AppState {
    /// Builds the per-process collaborators (limiter, caches) from `config`.
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            rate_limiter: Arc::new(RateLimiter::from_config(&config)),
            previews: PreviewCache::from_config(&config),
            pool,
            config,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<RateLimiter> {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limiter.clone()
    }
}

impl FromRef<AppState> for PreviewCache {
    fn from_ref(state: &AppState) -> Self {
        state.previews.clone()
    }
}
