// src/ranking/mod.rs

//! Weekly engagement ranking for the home page.
//!
//! Pure and synchronous: callers fetch posts and events, this module turns
//! them into placements. Nothing here performs I/O or fails.

pub mod aggregate;
pub mod engine;
pub mod leaderboard;
pub mod window;

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    engagement::{CommentEvent, ReactionEvent},
    post::{Post, RankedPost},
};

use aggregate::EngagementCounters;
use leaderboard::WriterScore;
use window::WeekWindow;

/// Tunables for the placement steps.
#[derive(Debug, Clone)]
pub struct RankingConfig {
    /// Reaction kinds backing the three "top" slots, in slot order.
    pub top_kinds: Vec<String>,
    pub top_eligible_channels: Vec<String>,
    /// Channels that get a section, in display order.
    pub section_channels: Vec<String>,
    pub per_channel_count: usize,
    pub recency_count: usize,
    pub leaderboard_size: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        let owned = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() };
        Self {
            top_kinds: owned(&["funny", "moving", "creative"]),
            top_eligible_channels: owned(&["stories", "release"]),
            section_channels: owned(&["stories", "release", "magazine"]),
            per_channel_count: 5,
            recency_count: 10,
            leaderboard_size: 5,
        }
    }
}

/// Posts placed in one channel's section.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSection {
    pub channel_slug: String,
    pub posts: Vec<RankedPost>,
}

/// Everything the home page shows, for one request.
#[derive(Debug, Serialize)]
pub struct Placements {
    pub window: WeekWindow,
    pub featured: Option<RankedPost>,
    pub top3: [Option<RankedPost>; 3],
    pub sections: Vec<ChannelSection>,
    pub recency: Vec<RankedPost>,
    pub leaderboard: Vec<WriterScore>,
}

/// Attaches weekly counters to each candidate, keeping candidate order.
pub fn enrich(
    posts: Vec<Post>,
    window: &WeekWindow,
    reactions: &[ReactionEvent],
    comments: &[CommentEvent],
) -> Vec<RankedPost> {
    let candidates: HashSet<Uuid> = posts.iter().map(|p| p.id).collect();
    let mut counters = EngagementCounters::fold(&candidates, window, reactions, comments);

    posts
        .into_iter()
        .map(|post| {
            let id = post.id;
            let mut ranked = RankedPost::new(post);
            ranked.week_reactions = counters.reactions_for(&id);
            ranked.week_comments = counters.comments_for(&id);
            ranked.week_reactions_by_kind = counters.take_kinds(&id);
            ranked
        })
        .collect()
}

/// Builds the home page placements from a candidate snapshot.
pub fn compute(
    posts: Vec<Post>,
    window: WeekWindow,
    reactions: &[ReactionEvent],
    comments: &[CommentEvent],
    config: &RankingConfig,
) -> Placements {
    let ranked = enrich(posts, &window, reactions, comments);
    let r = engine::rank(&ranked, config);

    tracing::debug!(
        candidates = ranked.len(),
        featured = ?r.featured.as_ref().map(|p| p.id()),
        top_filled = r.top3.iter().flatten().count(),
        writers = r.leaderboard.len(),
        "Computed home placements"
    );

    Placements {
        window,
        featured: r.featured,
        top3: r.top3,
        sections: r.sections,
        recency: r.recency,
        leaderboard: r.leaderboard,
    }
}
