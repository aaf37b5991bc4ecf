// src/ranking/aggregate.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::engagement::{CommentEvent, ReactionEvent};

use super::window::WeekWindow;

/// Weekly engagement counters keyed by post id.
#[derive(Debug, Default)]
pub struct EngagementCounters {
    pub reactions: HashMap<Uuid, u32>,
    pub comments: HashMap<Uuid, u32>,
    pub reactions_by_kind: HashMap<Uuid, HashMap<String, u32>>,
}

impl EngagementCounters {
    /// Folds raw events into per-post counters in a single pass over each stream.
    ///
    /// Events without a post id, for posts outside `candidates`, or outside the
    /// window are skipped.
    pub fn fold(
        candidates: &HashSet<Uuid>,
        window: &WeekWindow,
        reactions: &[ReactionEvent],
        comments: &[CommentEvent],
    ) -> Self {
        let mut counters = Self::default();
        let mut skipped = 0usize;
        let in_scope = |post_id: Option<Uuid>, at: DateTime<Utc>| {
            post_id.filter(|id| candidates.contains(id) && window.contains(at))
        };

        for event in reactions {
            let Some(post_id) = in_scope(event.post_id, event.created_at) else {
                skipped += 1;
                continue;
            };
            *counters.reactions.entry(post_id).or_default() += 1;

            let kind = event.kind.trim();
            if !kind.is_empty() {
                *counters
                    .reactions_by_kind
                    .entry(post_id)
                    .or_default()
                    .entry(kind.to_string())
                    .or_default() += 1;
            }
        }

        for event in comments {
            match in_scope(event.post_id, event.created_at) {
                Some(post_id) => *counters.comments.entry(post_id).or_default() += 1,
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "Discarded engagement events outside the candidates or window");
        }

        counters
    }

    pub fn reactions_for(&self, post_id: &Uuid) -> u32 {
        self.reactions.get(post_id).copied().unwrap_or(0)
    }

    pub fn comments_for(&self, post_id: &Uuid) -> u32 {
        self.comments.get(post_id).copied().unwrap_or(0)
    }

    /// Moves the per-kind breakdown of one post out of the counters.
    pub fn take_kinds(&mut self, post_id: &Uuid) -> HashMap<String, u32> {
        self.reactions_by_kind.remove(post_id).unwrap_or_default()
    }
}
