// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::moderation::{
        BanUserRequest, DeletionEvent, HistoryParams, ModeratePostRequest, ModeratedPost,
        ModeratedUser, ModerationStats, PostCounts, RestorePostRequest, UserCounts,
        UserModeration, UserStatusQuery,
    },
    utils::jwt::Claims,
};

/// Tables holding rows that hang off a post, cleared before a purge.
const POST_DEPENDENTS: [&str; 6] = [
    "comments",
    "post_bookmarks",
    "post_reaction_votes",
    "post_votes",
    "post_tags",
    "moderation_actions",
];

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    tracing::error!("{}: {:?}", context, e);
    AppError::InternalServerError(e.to_string())
}

pub(crate) async fn load_post(pool: &PgPool, post_id: Uuid) -> Result<ModeratedPost, AppError> {
    sqlx::query_as::<_, ModeratedPost>(
        r#"
        SELECT
            id, author_id, title, slug, channel_id::TEXT AS channel_id, status,
            published_at, is_anonymous, created_at, deleted_at
        FROM posts
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| db_error("Failed to load post for moderation", e))?
    .ok_or(AppError::NotFound("Post not found".to_string()))
}

async fn notify_author(
    pool: &PgPool,
    post: &ModeratedPost,
    payload: serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, actor_id, type, entity_type, entity_id, payload, is_read, created_at)
        VALUES ($1, NULL, 'post_deleted', 'post', $2, $3, false, NOW())
        "#,
    )
    .bind(post.author_id)
    .bind(post.id)
    .bind(payload)
    .execute(pool)
    .await
    .map(|_| ())
}

async fn record_action(
    pool: &PgPool,
    admin_id: Uuid,
    post: &ModeratedPost,
    action: &str,
    reason: &str,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO moderation_actions (actor_id, target_user_id, post_id, action, reason, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(admin_id)
    .bind(post.author_id)
    .bind(post.id)
    .bind(action)
    .bind(reason)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("Failed to record moderation action {} on {}: {:?}", action, post.id, e);
    }
}

/// The signed-in moderator.
pub async fn me(Extension(claims): Extension<Claims>) -> Result<impl IntoResponse, AppError> {
    let id = claims.user_id()?;
    Ok(Json(json!({
        "ok": true,
        "user": { "id": id, "email": claims.email },
    })))
}

/// Soft-deletes a post and tells its author why.
/// Admin only.
pub async fn delete_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ModeratePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let admin_id = claims.user_id()?;

    let post = load_post(&pool, payload.post_id).await?;
    if post.deleted_at.is_some() {
        return Err(AppError::BadRequest("הפוסט כבר נמחק.".to_string()));
    }

    sqlx::query(
        r#"
        UPDATE posts
        SET deleted_at = NOW(), deleted_by = $2, deleted_reason = $3
        WHERE id = $1
        "#,
    )
    .bind(post.id)
    .bind(admin_id)
    .bind(&payload.reason)
    .execute(&pool)
    .await
    .map_err(|e| db_error("Failed to soft-delete post", e))?;

    tracing::info!("Post {} soft-deleted by {}", post.id, admin_id);

    // The post stays deleted even if the author can't be told.
    if let Err(e) = notify_author(&pool, &post, post.deletion_notice(&payload.reason, false)).await {
        tracing::error!("Failed to notify author of deleted post {}: {:?}", post.id, e);
        return Ok(Json(json!({
            "ok": true,
            "warning": format!("Post deleted, but notification failed: {}", e),
        })));
    }

    record_action(&pool, admin_id, &post, "post_deleted", &payload.reason).await;

    Ok(Json(json!({ "ok": true })))
}

/// Brings a soft-deleted post back.
/// Admin only.
pub async fn restore_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RestorePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin_id = claims.user_id()?;

    let result = sqlx::query(
        r#"
        UPDATE posts
        SET deleted_at = NULL, deleted_by = NULL, deleted_reason = NULL
        WHERE id = $1
        "#,
    )
    .bind(payload.post_id)
    .execute(&pool)
    .await
    .map_err(|e| db_error("Failed to restore post", e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    tracing::info!("Post {} restored by {}", payload.post_id, admin_id);

    Ok(Json(json!({ "ok": true })))
}

/// Permanently removes a post and what hangs off it, leaving an audit trail.
/// Admin only.
pub async fn purge_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ModeratePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let admin_id = claims.user_id()?;

    let post = load_post(&pool, payload.post_id).await?;

    // Best-effort cleanup; the final delete below is what must succeed.
    for table in POST_DEPENDENTS {
        let sql = format!("DELETE FROM {table} WHERE post_id = $1");
        if let Err(e) = sqlx::query(&sql).bind(post.id).execute(&pool).await {
            tracing::warn!("Purge of {}: cleanup of {} failed: {:?}", post.id, table, e);
        }
    }
    if let Err(e) = sqlx::query("DELETE FROM notifications WHERE entity_type = 'post' AND entity_id = $1")
        .bind(post.id)
        .execute(&pool)
        .await
    {
        tracing::warn!("Purge of {}: cleanup of notifications failed: {:?}", post.id, e);
    }

    if let Err(e) = notify_author(&pool, &post, post.deletion_notice(&payload.reason, true)).await {
        tracing::warn!("Failed to notify author of purged post {}: {:?}", post.id, e);
    }

    // Audit rows go in while the post row still exists.
    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO deletion_events (action, actor_user_id, actor_kind, target_post_id, post_snapshot, reason, created_at)
        VALUES ('admin_hard_delete', $1, 'admin', $2, $3, $4, NOW())
        "#,
    )
    .bind(admin_id)
    .bind(post.id)
    .bind(post.snapshot())
    .bind(&payload.reason)
    .execute(&pool)
    .await
    {
        tracing::warn!("Failed to record deletion event for {}: {:?}", post.id, e);
    }
    record_action(&pool, admin_id, &post, "post_purged", &payload.reason).await;

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post.id)
        .execute(&pool)
        .await
        .map_err(|e| db_error("Failed to purge post", e))?;

    tracing::info!("Post {} purged by {}", post.id, admin_id);

    Ok(Json(json!({ "ok": true })))
}

fn push_history_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, params: &'a HistoryParams) {
    qb.push(" WHERE TRUE");
    if let Some(action) = params.action() {
        qb.push(" AND e.action = ").push_bind(action);
    }
    if let Some(kind) = params.actor_kind() {
        qb.push(" AND e.actor_kind = ").push_bind(kind);
    }
    if let Some(from) = params.created_from() {
        qb.push(" AND e.created_at >= ").push_bind(from);
    }
    if let Some(before) = params.created_before() {
        qb.push(" AND e.created_at < ").push_bind(before);
    }
    if let Some(pattern) = params.search() {
        qb.push(" AND (e.post_snapshot->>'title' ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.post_snapshot->>'slug' ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(pattern) = params.author_search() {
        qb.push(" AND au.display_name ILIKE ").push_bind(pattern);
    }
}

const HISTORY_FROM: &str = r#"
    FROM deletion_events e
    LEFT JOIN profiles a ON a.id = e.actor_user_id
    LEFT JOIN profiles au ON au.id::TEXT = e.post_snapshot->>'author_id'
"#;

/// Deletion audit trail, newest first.
/// Admin only.
pub async fn deletion_history(
    State(pool): State<PgPool>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*)");
    count_qb.push(HISTORY_FROM);
    push_history_filters(&mut count_qb, &params);

    let mut list_qb: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT
            e.id::TEXT AS id, e.action, e.actor_kind, e.actor_user_id, e.target_post_id,
            e.post_snapshot, e.reason, e.created_at,
            a.username AS actor_username, a.display_name AS actor_display_name,
            au.username AS author_username, au.display_name AS author_display_name
        "#,
    );
    list_qb.push(HISTORY_FROM);
    push_history_filters(&mut list_qb, &params);
    list_qb
        .push(" ORDER BY e.created_at DESC LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());

    let (total, events) = tokio::try_join!(
        count_qb.build_query_scalar::<i64>().fetch_one(&pool),
        list_qb.build_query_as::<DeletionEvent>().fetch_all(&pool),
    )
    .map_err(|e| db_error("Failed to load deletion history", e))?;

    Ok(Json(json!({ "ok": true, "events": events, "total": total })))
}

/// Headline counts for the moderation dashboard.
/// Admin only.
pub async fn stats(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let count = |sql: &'static str| sqlx::query_scalar::<_, i64>(sql).fetch_one(&pool);

    let (total, published, deleted, users) = tokio::try_join!(
        count("SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL"),
        count("SELECT COUNT(*) FROM posts WHERE status = 'published' AND deleted_at IS NULL"),
        count("SELECT COUNT(*) FROM posts WHERE deleted_at IS NOT NULL"),
        count("SELECT COUNT(*) FROM profiles"),
    )
    .map_err(|e| db_error("Failed to load moderation stats", e))?;

    let stats = ModerationStats {
        posts: PostCounts { total, published, deleted },
        users: UserCounts { total: users },
    };

    Ok(Json(json!({ "ok": true, "posts": stats.posts, "users": stats.users })))
}

/// Bans or unbans a user. Banning clears any suspension.
/// Admin only.
pub async fn ban_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BanUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let admin_id = claims.user_id()?;

    sqlx::query(
        r#"
        INSERT INTO user_moderation (user_id, is_banned, ban_reason, banned_at, banned_by, updated_at)
        VALUES ($1, $2, $3, CASE WHEN $2 THEN NOW() END, CASE WHEN $2 THEN $4 END, NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            is_banned = EXCLUDED.is_banned,
            ban_reason = EXCLUDED.ban_reason,
            banned_at = EXCLUDED.banned_at,
            banned_by = EXCLUDED.banned_by,
            is_suspended = CASE WHEN EXCLUDED.is_banned THEN false ELSE user_moderation.is_suspended END,
            suspended_at = CASE WHEN EXCLUDED.is_banned THEN NULL ELSE user_moderation.suspended_at END,
            suspended_by = CASE WHEN EXCLUDED.is_banned THEN NULL ELSE user_moderation.suspended_by END,
            reason = CASE WHEN EXCLUDED.is_banned THEN NULL ELSE user_moderation.reason END,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(payload.user_id)
    .bind(payload.is_banned)
    .bind(&payload.reason)
    .bind(admin_id)
    .execute(&pool)
    .await
    .map_err(|e| {
        let code = e
            .as_database_error()
            .and_then(|d| d.code())
            .map(|c| c.into_owned());
        match code.as_deref() {
            // invalid text representation, foreign key violation
            Some("22P02") | Some("23503") => AppError::BadRequest("Unknown user".to_string()),
            _ => db_error("Failed to update user ban", e),
        }
    })?;

    let action = if payload.is_banned { "ban" } else { "unban" };
    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO user_moderation_events (user_id, actor_id, action, reason, created_at)
        VALUES ($1, $2, $3, $4, NOW())
        "#,
    )
    .bind(payload.user_id)
    .bind(admin_id)
    .bind(action)
    .bind(&payload.reason)
    .execute(&pool)
    .await
    {
        tracing::warn!("Failed to record {} of {}: {:?}", action, payload.user_id, e);
    }

    tracing::info!("User {} {} by {}", payload.user_id, action, admin_id);

    Ok(Json(json!({ "ok": true })))
}

/// A user's profile and moderation state.
/// Admin only.
pub async fn user_status(
    State(pool): State<PgPool>,
    Query(query): Query<UserStatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, ModeratedUser>(
        "SELECT id, username, display_name, avatar_url, created_at FROM profiles WHERE id = $1",
    )
    .bind(query.user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| db_error("Failed to load user", e))?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let moderation = sqlx::query_as::<_, UserModeration>(
        r#"
        SELECT
            COALESCE(is_suspended, false) AS is_suspended, reason, suspended_at, suspended_by,
            COALESCE(is_banned, false) AS is_banned, ban_reason, banned_at, banned_by
        FROM user_moderation
        WHERE user_id = $1
        "#,
    )
    .bind(query.user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| db_error("Failed to load user moderation", e))?
    .unwrap_or_default();

    Ok(Json(json!({
        "ok": true,
        "user": {
            "id": user.id,
            "username": user.username,
            "display_name": user.display_name,
            "avatar_url": user.avatar_url,
            "created_at": user.created_at,
            "moderation": moderation,
        },
    })))
}
