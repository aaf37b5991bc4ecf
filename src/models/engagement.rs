// src/models/engagement.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A single vote from `post_reaction_votes`.
#[derive(Debug, Clone, FromRow)]
pub struct ReactionEvent {
    /// Rows without a post are malformed and skipped during aggregation.
    pub post_id: Option<Uuid>,
    /// Reaction label, e.g. "funny", "moving", "gold".
    #[sqlx(rename = "reaction_key")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

/// A comment from `comments`, reduced to what the weekly counters need.
#[derive(Debug, Clone, FromRow)]
pub struct CommentEvent {
    pub post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
