// src/handlers/notification.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::notification::{self, Notification, NotificationListParams, NotificationRow},
    utils::jwt::Claims,
};

/// List the current user's notifications, grouped by post and action.
pub async fn list_notifications(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<NotificationListParams>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;
    let user_id = claims.user_id()?;
    let limit = params.limit.unwrap_or(200);

    let rows = sqlx::query_as::<_, NotificationRow>(
        r#"
        SELECT
            n.id, n.type, n.entity_id::TEXT AS entity_id, n.payload, n.created_at,
            a.username AS actor_username,
            a.display_name AS actor_display_name,
            a.avatar_url AS actor_avatar_url
        FROM notifications n
        LEFT JOIN profiles a ON a.id = n.actor_id
        WHERE n.user_id = $1
        ORDER BY n.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list notifications: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let unread = rows.len();
    let groups = notification::group(rows.into_iter().map(Notification::from).collect());

    Ok(Json(serde_json::json!({
        "unread": unread,
        "groups": groups,
    })))
}

/// Delete all of the current user's notifications.
pub async fn clear_notifications(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to clear notifications: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!("Cleared {} notifications for {}", result.rows_affected(), user_id);

    Ok(StatusCode::NO_CONTENT)
}
