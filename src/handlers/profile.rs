// src/handlers/profile.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::profile::{PreviewPath, UserPreview},
    utils::preview_cache::PreviewCache,
};

/// Hover-card preview of a user, served from the preview cache.
pub async fn get_preview(
    State(pool): State<PgPool>,
    State(previews): State<PreviewCache>,
    Path(path): Path<PreviewPath>,
) -> Result<impl IntoResponse, AppError> {
    path.validate()?;

    let preview = previews
        .get_or_load(&path.username, load_preview(&pool, &path.username))
        .await?;

    Ok(Json(preview))
}

async fn load_preview(pool: &PgPool, username: &str) -> Result<UserPreview, AppError> {
    tracing::debug!("Loading preview for {}", username);

    sqlx::query_as::<_, UserPreview>(
        r#"
        SELECT
            p.id, p.display_name, p.username, p.avatar_url, p.bio,
            (SELECT COUNT(*) FROM user_follows f WHERE f.following_id = p.id) AS followers_count
        FROM profiles p
        WHERE p.username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load profile preview: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("User not found".to_string()))
}
