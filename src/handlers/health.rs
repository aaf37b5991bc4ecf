// src/handlers/health.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

/// Reports whether the database answers a trivial query on profiles.
pub async fn health(State(pool): State<PgPool>) -> impl IntoResponse {
    let reachable = match sqlx::query("SELECT 1 FROM profiles LIMIT 1")
        .fetch_optional(&pool)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Health check failed: {:?}", e);
            false
        }
    };

    let (status, label, database) = if reachable {
        (StatusCode::OK, "ok", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
    };

    (
        status,
        Json(json!({
            "status": label,
            "timestamp": Utc::now(),
            "services": { "database": database },
        })),
    )
}
