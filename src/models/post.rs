// src/models/post.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Fallback author name for posts whose profile has neither a display name nor a username.
pub const ANONYMOUS_AUTHOR: &str = "אנונימי";

/// A published post as supplied to the home page ranking.
/// Joined from `posts`, `channels` and the author's `profiles` row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub cover_image_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,

    pub subcategory_tag_id: Option<i64>,
    pub channel_slug: Option<String>,
    pub channel_name: Option<String>,

    pub author_username: Option<String>,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,

    /// Resolved from `subcategory_tag_id` after the tag lookup.
    #[sqlx(skip)]
    pub subcategory: Option<Tag>,
    #[sqlx(skip)]
    pub tags: Vec<Tag>,
}

impl Post {
    /// The timestamp a post is listed under: `published_at`, else `created_at`.
    pub fn display_at(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.created_at)
    }

    /// Name shown next to the post.
    pub fn author_name(&self) -> &str {
        non_empty(self.author_display_name.as_deref())
            .or_else(|| non_empty(self.author_username.as_deref()))
            .unwrap_or(ANONYMOUS_AUTHOR)
    }

    /// Identity used to group posts by writer: username if present, else the display name.
    pub fn author_key(&self) -> &str {
        non_empty(self.author_username.as_deref()).unwrap_or_else(|| self.author_name())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A tag (`tags` table), used both for subcategories and free tags.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct Tag {
    #[serde(skip)]
    pub id: i64,
    pub name_he: String,
    pub slug: String,
}

/// Row of the `post_tags` join, flattened with the tag's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct PostTagRow {
    pub post_id: Uuid,
    pub name_he: String,
    pub slug: String,
}

/// A candidate post enriched with its engagement inside the active week window.
/// Recomputed on every request.
#[derive(Debug, Clone, Serialize)]
pub struct RankedPost {
    #[serde(flatten)]
    pub post: Post,
    pub author_name: String,
    pub display_at: DateTime<Utc>,
    pub week_reactions: u32,
    pub week_comments: u32,
    pub week_reactions_by_kind: HashMap<String, u32>,
}

impl RankedPost {
    pub fn new(post: Post) -> Self {
        Self {
            author_name: post.author_name().to_string(),
            display_at: post.display_at(),
            post,
            week_reactions: 0,
            week_comments: 0,
            week_reactions_by_kind: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.post.id
    }

    pub fn channel_slug(&self) -> Option<&str> {
        self.post.channel_slug.as_deref()
    }

    /// Weekly count for a single reaction kind (0 when absent).
    pub fn kind_count(&self, kind: &str) -> u32 {
        self.week_reactions_by_kind.get(kind).copied().unwrap_or(0)
    }

    pub fn has_weekly_signal(&self) -> bool {
        self.week_reactions > 0 || self.week_comments > 0
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::post;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_at_prefers_published_at() {
        let mut p = post(1, "stories", "dana", 0);
        assert_eq!(p.display_at(), p.created_at);

        let published = Utc.with_ymd_and_hms(2024, 3, 19, 10, 0, 0).unwrap();
        p.published_at = Some(published);
        assert_eq!(p.display_at(), published);
    }

    #[test]
    fn author_key_falls_back_to_display_name() {
        let mut p = post(1, "stories", "dana", 0);
        p.author_display_name = Some("Dana L".to_string());
        assert_eq!(p.author_key(), "dana");
        assert_eq!(p.author_name(), "Dana L");

        p.author_username = None;
        assert_eq!(p.author_key(), "Dana L");

        p.author_display_name = Some("  ".to_string());
        assert_eq!(p.author_key(), ANONYMOUS_AUTHOR);
    }
}
