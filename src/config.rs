// src/config.rs

use std::env;
use std::str::FromStr;
use dotenvy::dotenv;

use crate::ranking::{RankingConfig, window::DEFAULT_WEEK_ZONE};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Secret shared with the auth provider for HS256 access tokens.
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub rust_log: String,
    pub port: u16,

    /// IANA zone whose calendar week scopes trending.
    pub week_timezone: String,
    pub home_candidate_limit: i64,
    pub ranking: RankingConfig,

    pub rate_limit_per_minute: u32,
    pub rate_limit_burst: u32,
    pub rate_limit_max_keys: usize,

    pub preview_cache_capacity: u64,
    pub preview_cache_ttl_secs: u64,
}

/// Reads an optional variable, keeping `default` when unset or unparsable.
fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let defaults = Self::with_defaults(&database_url, &jwt_secret);

        Self {
            jwt_audience: var_or("JWT_AUDIENCE", defaults.jwt_audience.clone()),
            rust_log,
            port: var_or("PORT", defaults.port),
            week_timezone: var_or("WEEK_TIMEZONE", defaults.week_timezone.clone()),
            home_candidate_limit: var_or("HOME_CANDIDATE_LIMIT", defaults.home_candidate_limit),
            rate_limit_per_minute: var_or("RATE_LIMIT_PER_MINUTE", defaults.rate_limit_per_minute),
            rate_limit_burst: var_or("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            rate_limit_max_keys: var_or("RATE_LIMIT_MAX_KEYS", defaults.rate_limit_max_keys),
            preview_cache_capacity: var_or("PREVIEW_CACHE_CAPACITY", defaults.preview_cache_capacity),
            preview_cache_ttl_secs: var_or("PREVIEW_CACHE_TTL_SECS", defaults.preview_cache_ttl_secs),
            ..defaults
        }
    }

    /// Defaults for everything but the connection string and secret.
    pub fn with_defaults(database_url: &str, jwt_secret: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_audience: "authenticated".to_string(),
            rust_log: "info".to_string(),
            port: 3000,
            week_timezone: DEFAULT_WEEK_ZONE.to_string(),
            home_candidate_limit: 250,
            ranking: RankingConfig::default(),
            rate_limit_per_minute: 120,
            rate_limit_burst: 20,
            rate_limit_max_keys: 10_000,
            preview_cache_capacity: 1_000,
            preview_cache_ttl_secs: 300,
        }
    }
}
