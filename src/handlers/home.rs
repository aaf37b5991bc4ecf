// src/handlers/home.rs

use std::collections::HashMap;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::{
        engagement::{CommentEvent, ReactionEvent},
        post::{Post, PostTagRow, Tag},
    },
    ranking::{self, window::{WeekWindow, resolve_zone}},
    utils::html,
};

/// Excerpts are cut to this many characters.
const EXCERPT_CHARS: usize = 150;

/// Home page: weekly featured post, top posts by reaction kind, channel
/// sections, latest posts and writers of the week.
pub async fn get_home(
    State(pool): State<PgPool>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    let window = WeekWindow::containing(Utc::now(), resolve_zone(&config.week_timezone));

    let mut posts = fetch_candidates(&pool, config.home_candidate_limit).await?;
    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();

    let mut subcategory_ids: Vec<i64> = posts.iter().filter_map(|p| p.subcategory_tag_id).collect();
    subcategory_ids.sort_unstable();
    subcategory_ids.dedup();

    let (reactions, comments, subcategories, post_tags) = if post_ids.is_empty() {
        Default::default()
    } else {
        tokio::try_join!(
            fetch_reactions(&pool, &post_ids, &window),
            fetch_comments(&pool, &post_ids, &window),
            fetch_tags(&pool, &subcategory_ids),
            fetch_post_tags(&pool, &post_ids),
        )?
    };

    attach_tags(&mut posts, subcategories, post_tags);

    let placements = ranking::compute(posts, window, &reactions, &comments, &config.ranking);

    Ok(Json(placements))
}

/// Published, non-deleted posts, newest first.
async fn fetch_candidates(pool: &PgPool, limit: i64) -> Result<Vec<Post>, AppError> {
    sqlx::query_as::<_, Post>(
        r#"
        SELECT
            p.id, p.title, p.slug, p.excerpt, p.cover_image_url,
            p.created_at, p.published_at,
            p.subcategory_tag_id::BIGINT AS subcategory_tag_id,
            c.slug AS channel_slug, c.name_he AS channel_name,
            pr.username AS author_username,
            pr.display_name AS author_display_name,
            pr.avatar_url AS author_avatar_url
        FROM posts p
        LEFT JOIN channels c ON c.id = p.channel_id
        LEFT JOIN profiles pr ON pr.id = p.author_id
        WHERE p.deleted_at IS NULL
          AND p.status = 'published'
        ORDER BY p.published_at DESC NULLS LAST
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch home candidates: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })
}

async fn fetch_reactions(
    pool: &PgPool,
    post_ids: &[Uuid],
    window: &WeekWindow,
) -> Result<Vec<ReactionEvent>, AppError> {
    sqlx::query_as::<_, ReactionEvent>(
        r#"
        SELECT post_id, reaction_key, created_at
        FROM post_reaction_votes
        WHERE post_id = ANY($1)
          AND created_at >= $2
          AND created_at < $3
        "#,
    )
    .bind(post_ids)
    .bind(window.start)
    .bind(window.end)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch weekly reactions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })
}

async fn fetch_comments(
    pool: &PgPool,
    post_ids: &[Uuid],
    window: &WeekWindow,
) -> Result<Vec<CommentEvent>, AppError> {
    sqlx::query_as::<_, CommentEvent>(
        r#"
        SELECT post_id, created_at
        FROM comments
        WHERE post_id = ANY($1)
          AND created_at >= $2
          AND created_at < $3
        "#,
    )
    .bind(post_ids)
    .bind(window.start)
    .bind(window.end)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch weekly comments: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })
}

async fn fetch_tags(pool: &PgPool, ids: &[i64]) -> Result<Vec<Tag>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let tags = sqlx::query_as::<_, Tag>(
        "SELECT id::BIGINT AS id, name_he, slug FROM tags WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

async fn fetch_post_tags(pool: &PgPool, post_ids: &[Uuid]) -> Result<Vec<PostTagRow>, AppError> {
    let rows = sqlx::query_as::<_, PostTagRow>(
        r#"
        SELECT pt.post_id, t.name_he, t.slug
        FROM post_tags pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.post_id = ANY($1)
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Resolves subcategories and tag lists, and reduces excerpts to plain text.
fn attach_tags(posts: &mut [Post], subcategories: Vec<Tag>, post_tags: Vec<PostTagRow>) {
    let by_id: HashMap<i64, Tag> = subcategories.into_iter().map(|t| (t.id, t)).collect();

    let mut tags_by_post: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for row in post_tags {
        tags_by_post.entry(row.post_id).or_default().push(Tag {
            id: 0,
            name_he: row.name_he,
            slug: row.slug,
        });
    }

    for post in posts.iter_mut() {
        post.subcategory = post.subcategory_tag_id.and_then(|id| by_id.get(&id).cloned());
        post.tags = tags_by_post.remove(&post.id).unwrap_or_default();
        post.excerpt = post
            .excerpt
            .as_deref()
            .map(|e| html::excerpt(e, EXCERPT_CHARS))
            .filter(|e| !e.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::fixtures::post;

    #[test]
    fn attach_tags_resolves_subcategory_tags_and_excerpt() {
        let mut a = post(1, "stories", "dana", 0);
        a.subcategory_tag_id = Some(7);
        a.excerpt = Some("<p>   </p>".to_string());
        let mut b = post(2, "release", "avi", 0);
        b.subcategory_tag_id = Some(99);
        b.excerpt = Some("<em>שיר</em> קצר".to_string());

        let subcategories = vec![Tag { id: 7, name_he: "פנטזיה".into(), slug: "fantasy".into() }];
        let post_tags = vec![
            PostTagRow { post_id: Uuid::from_u128(2), name_he: "ים".into(), slug: "sea".into() },
            PostTagRow { post_id: Uuid::from_u128(2), name_he: "קיץ".into(), slug: "summer".into() },
        ];

        let mut posts = vec![a, b];
        attach_tags(&mut posts, subcategories, post_tags);

        assert_eq!(posts[0].subcategory.as_ref().map(|t| t.slug.as_str()), Some("fantasy"));
        assert!(posts[0].tags.is_empty());
        assert_eq!(posts[0].excerpt, None);

        assert_eq!(posts[1].subcategory, None);
        assert_eq!(posts[1].tags.len(), 2);
        assert_eq!(posts[1].excerpt.as_deref(), Some("שיר קצר"));
    }
}
