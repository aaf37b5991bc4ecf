// src/utils/preview_cache.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::{config::Config, error::AppError, models::profile::UserPreview};

/// Bounded cache of profile previews keyed by username.
///
/// Concurrent lookups of the same username share a single load. Failed loads
/// (including unknown users) are not stored.
#[derive(Clone)]
pub struct PreviewCache {
    cache: Cache<String, UserPreview>,
}

impl PreviewCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.preview_cache_capacity,
            Duration::from_secs(config.preview_cache_ttl_secs),
        )
    }

    /// Returns the cached preview or runs `load` once for all concurrent callers.
    pub async fn get_or_load<F>(&self, username: &str, load: F) -> Result<UserPreview, AppError>
    where
        F: Future<Output = Result<UserPreview, AppError>>,
    {
        self.cache
            .try_get_with(username.to_string(), load)
            .await
            .map_err(|e: Arc<AppError>| match e.as_ref() {
                AppError::NotFound(msg) => AppError::NotFound(msg.clone()),
                AppError::BadRequest(msg) => AppError::BadRequest(msg.clone()),
                other => AppError::InternalServerError(other.to_string()),
            })
    }

    #[cfg(test)]
    pub async fn invalidate(&self, username: &str) {
        self.cache.invalidate(username).await;
    }
}
