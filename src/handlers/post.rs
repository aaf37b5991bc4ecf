// src/handlers/post.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::admin::load_post,
    models::moderation::{RESTORE_WINDOW_DAYS, within_restore_window},
    utils::jwt::Claims,
};

/// Lets an author take their own post back out of the trash.
pub async fn restore_own_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let post = load_post(&pool, post_id).await?;

    if post.author_id != Some(user_id) {
        return Err(AppError::Forbidden("not your post".to_string()));
    }
    let Some(deleted_at) = post.deleted_at else {
        return Err(AppError::BadRequest("post is not deleted".to_string()));
    };
    if !within_restore_window(deleted_at, Utc::now()) {
        return Err(AppError::BadRequest(format!(
            "חלון השחזור עבר ({} יום). הפוסט יימחק לצמיתות.",
            RESTORE_WINDOW_DAYS
        )));
    }

    sqlx::query("UPDATE posts SET deleted_at = NULL WHERE id = $1 AND author_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to restore own post: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!("Post {} restored by its author", post_id);

    Ok(Json(json!({ "ok": true })))
}
