// src/ranking/engine.rs

use std::cmp::Ordering;
use std::collections::HashSet;

use uuid::Uuid;

use crate::models::post::RankedPost;

use super::{ChannelSection, RankingConfig, leaderboard};

/// Output of the placement steps, before the window is attached.
#[derive(Debug, Default)]
pub struct Ranking {
    pub featured: Option<RankedPost>,
    pub top3: [Option<RankedPost>; 3],
    pub sections: Vec<ChannelSection>,
    pub recency: Vec<RankedPost>,
    pub leaderboard: Vec<leaderboard::WriterScore>,
}

fn by_engagement(a: &RankedPost, b: &RankedPost) -> Ordering {
    b.week_reactions
        .cmp(&a.week_reactions)
        .then(b.week_comments.cmp(&a.week_comments))
        .then(b.display_at.cmp(&a.display_at))
}

fn by_kind(kind: &str) -> impl Fn(&RankedPost, &RankedPost) -> Ordering + '_ {
    move |a: &RankedPost, b: &RankedPost| {
        b.kind_count(kind)
            .cmp(&a.kind_count(kind))
            .then(b.week_reactions.cmp(&a.week_reactions))
            .then(b.display_at.cmp(&a.display_at))
    }
}

fn by_recency(a: &RankedPost, b: &RankedPost) -> Ordering {
    b.display_at.cmp(&a.display_at)
}

/// Stable sort of borrowed posts, input order breaking remaining ties.
fn sorted<'a, I, F>(posts: I, cmp: F) -> Vec<&'a RankedPost>
where
    I: IntoIterator<Item = &'a RankedPost>,
    F: Fn(&RankedPost, &RankedPost) -> Ordering,
{
    let mut out: Vec<&RankedPost> = posts.into_iter().collect();
    out.sort_by(|a, b| cmp(*a, *b));
    out
}

/// Takes up to `n` posts not yet placed, claiming each one as it is taken.
fn take_unused(sorted: &[&RankedPost], n: usize, used: &mut HashSet<Uuid>) -> Vec<RankedPost> {
    let mut out = Vec::new();
    for p in sorted {
        if out.len() >= n {
            break;
        }
        if used.insert(p.id()) {
            out.push((*p).clone());
        }
    }
    out
}

/// Runs the placement steps in order. Featured, top-by-kind and channel
/// sections never share a post; recency and the leaderboard ignore `used`.
pub fn rank(posts: &[RankedPost], config: &RankingConfig) -> Ranking {
    let mut used: HashSet<Uuid> = HashSet::new();

    // 1. featured
    let featured = sorted(posts, by_engagement)
        .first()
        .map(|p| (*p).clone());
    if let Some(p) = &featured {
        used.insert(p.id());
    }

    // 2. one post per reaction kind, eligible channels only
    let eligible: Vec<&RankedPost> = posts
        .iter()
        .filter(|p| {
            p.channel_slug()
                .is_some_and(|c| config.top_eligible_channels.iter().any(|e| e == c))
        })
        .collect();

    let mut top3: [Option<RankedPost>; 3] = Default::default();
    for (slot, kind) in top3.iter_mut().zip(&config.top_kinds) {
        let pick = sorted(eligible.iter().copied(), by_kind(kind))
            .into_iter()
            .find(|p| !used.contains(&p.id()));
        if let Some(p) = pick {
            used.insert(p.id());
            *slot = Some(p.clone());
        }
    }

    // 3. channel sections, greedy in configured order
    let sections = config
        .section_channels
        .iter()
        .map(|channel| {
            let in_channel: Vec<&RankedPost> = posts
                .iter()
                .filter(|p| p.channel_slug() == Some(channel.as_str()))
                .collect();
            let ordered = if in_channel.iter().any(|p| p.has_weekly_signal()) {
                sorted(in_channel, by_engagement)
            } else {
                sorted(in_channel, by_recency)
            };
            ChannelSection {
                channel_slug: channel.clone(),
                posts: take_unused(&ordered, config.per_channel_count, &mut used),
            }
        })
        .collect();

    // 4. recency, may repeat placed posts
    let recency = sorted(posts, by_recency)
        .into_iter()
        .take(config.recency_count)
        .cloned()
        .collect();

    // 5. writers
    let leaderboard = leaderboard::writers_of_week(posts, config.leaderboard_size);

    Ranking {
        featured,
        top3,
        sections,
        recency,
        leaderboard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::fixtures::post;

    fn ranked(n: u128, channel: &str, minutes: i64, reactions: u32, comments: u32) -> RankedPost {
        let mut r = RankedPost::new(post(n, channel, &format!("author{n}"), minutes));
        r.week_reactions = reactions;
        r.week_comments = comments;
        r
    }

    fn with_kind(mut r: RankedPost, kind: &str, count: u32) -> RankedPost {
        r.week_reactions_by_kind.insert(kind.to_string(), count);
        r
    }

    fn ids(posts: &[RankedPost]) -> Vec<u128> {
        posts.iter().map(|p| p.id().as_u128()).collect()
    }

    fn slot_id(slot: &Option<RankedPost>) -> Option<u128> {
        slot.as_ref().map(|p| p.id().as_u128())
    }

    #[test]
    fn empty_candidates_give_empty_placements() {
        let r = rank(&[], &RankingConfig::default());
        assert!(r.featured.is_none());
        assert!(r.top3.iter().all(Option::is_none));
        assert!(r.sections.iter().all(|s| s.posts.is_empty()));
        assert!(r.recency.is_empty());
        assert!(r.leaderboard.is_empty());
    }

    #[test]
    fn featured_orders_by_reactions_comments_then_recency() {
        let posts = vec![
            ranked(1, "magazine", 10, 3, 9),
            ranked(2, "magazine", 20, 5, 1),
            ranked(3, "magazine", 30, 5, 2),
            ranked(4, "magazine", 40, 5, 2),
        ];
        let r = rank(&posts, &RankingConfig::default());
        assert_eq!(slot_id(&r.featured), Some(4));
    }

    #[test]
    fn featured_ties_keep_input_order() {
        let posts = vec![ranked(7, "magazine", 0, 1, 0), ranked(8, "magazine", 0, 1, 0)];
        let r = rank(&posts, &RankingConfig::default());
        assert_eq!(slot_id(&r.featured), Some(7));
    }

    #[test]
    fn top3_picks_by_kind_from_eligible_channels() {
        let posts = vec![
            // featured: most reactions overall
            with_kind(ranked(1, "stories", 0, 20, 0), "funny", 9),
            with_kind(ranked(2, "stories", 0, 4, 0), "funny", 4),
            with_kind(ranked(3, "release", 0, 3, 0), "moving", 3),
            with_kind(ranked(4, "release", 0, 2, 0), "creative", 2),
            // magazine is not eligible for the top slots
            with_kind(ranked(5, "magazine", 0, 10, 0), "creative", 10),
        ];
        let r = rank(&posts, &RankingConfig::default());

        assert_eq!(slot_id(&r.featured), Some(1));
        assert_eq!(r.top3.iter().map(slot_id).collect::<Vec<_>>(), [Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn top3_falls_back_to_zero_count_candidates() {
        let posts = vec![
            ranked(1, "stories", 50, 0, 0),
            ranked(2, "stories", 40, 0, 0),
            ranked(3, "release", 30, 0, 0),
            ranked(4, "release", 20, 0, 0),
        ];
        let r = rank(&posts, &RankingConfig::default());

        assert_eq!(slot_id(&r.featured), Some(1));
        assert_eq!(r.top3.iter().map(slot_id).collect::<Vec<_>>(), [Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn top3_slot_is_empty_without_eligible_candidates() {
        let posts: Vec<_> = (1..=5).map(|n| ranked(n, "magazine", -(n as i64), 0, 0)).collect();
        let r = rank(&posts, &RankingConfig::default());

        assert_eq!(slot_id(&r.featured), Some(1));
        assert!(r.top3.iter().all(Option::is_none));
        assert_eq!(ids(&r.sections[2].posts), [2, 3, 4, 5]);
    }

    #[test]
    fn sections_rank_by_engagement_when_channel_is_active() {
        let config = RankingConfig {
            top_eligible_channels: Vec::new(),
            ..RankingConfig::default()
        };
        // a: 5 reactions newest, b: 5 reactions older, c: 2 reactions
        let posts = vec![
            ranked(100, "release", 99, 50, 0),
            ranked(2, "stories", 20, 5, 0),
            ranked(1, "stories", 30, 5, 0),
            ranked(3, "stories", 10, 2, 0),
        ];
        let r = rank(&posts, &config);

        assert_eq!(slot_id(&r.featured), Some(100));
        assert_eq!(r.sections[0].channel_slug, "stories");
        assert_eq!(ids(&r.sections[0].posts), [1, 2, 3]);
    }

    #[test]
    fn sections_fall_back_to_recency_without_activity() {
        let config = RankingConfig {
            top_eligible_channels: Vec::new(),
            ..RankingConfig::default()
        };
        let posts = vec![
            ranked(9, "magazine", 100, 1, 0),
            ranked(1, "stories", 10, 0, 0),
            ranked(2, "stories", 30, 0, 0),
            ranked(3, "stories", 20, 0, 0),
        ];
        let r = rank(&posts, &config);
        assert_eq!(ids(&r.sections[0].posts), [2, 3, 1]);
    }

    #[test]
    fn sections_cap_at_per_channel_count() {
        let posts: Vec<_> = (1..=8).map(|n| ranked(n, "release", n as i64, 0, 0)).collect();
        let config = RankingConfig {
            top_eligible_channels: Vec::new(),
            ..RankingConfig::default()
        };
        let r = rank(&posts, &config);
        // post 8 is featured, next five newest fill the section
        assert_eq!(ids(&r.sections[1].posts), [7, 6, 5, 4, 3]);
    }

    #[test]
    fn exclusive_placements_never_repeat_a_post() {
        let posts: Vec<_> = (1..=30u128)
            .map(|n| {
                let channel = ["stories", "release", "magazine"][(n % 3) as usize];
                let kind = ["funny", "moving", "creative"][(n % 3) as usize];
                with_kind(ranked(n, channel, (n * 7 % 13) as i64, (n % 5) as u32, (n % 4) as u32), kind, (n % 6) as u32)
            })
            .collect();
        let r = rank(&posts, &RankingConfig::default());

        let mut seen = HashSet::new();
        let exclusive = r
            .featured
            .iter()
            .chain(r.top3.iter().flatten())
            .chain(r.sections.iter().flat_map(|s| s.posts.iter()));
        for p in exclusive {
            assert!(seen.insert(p.id()), "post placed twice: {}", p.id());
        }
        assert_eq!(seen.len(), 1 + 3 + 15);
    }

    #[test]
    fn recency_ignores_used_and_caps_at_count() {
        let posts: Vec<_> = (1..=12).map(|n| ranked(n, "stories", n as i64, 0, 0)).collect();
        let r = rank(&posts, &RankingConfig::default());

        assert_eq!(ids(&r.recency), [12, 11, 10, 9, 8, 7, 6, 5, 4, 3]);
        assert_eq!(slot_id(&r.featured), Some(12));
    }

    #[test]
    fn empty_events_feature_most_recent_post() {
        let posts: Vec<_> = (1..=5).map(|n| ranked(n, "stories", 100 - n as i64, 0, 0)).collect();
        let r = rank(&posts, &RankingConfig::default());

        assert_eq!(slot_id(&r.featured), Some(1));
        assert_eq!(r.top3.iter().map(slot_id).collect::<Vec<_>>(), [Some(2), Some(3), Some(4)]);
        assert_eq!(ids(&r.sections[0].posts), [5]);
        assert!(r.leaderboard.is_empty());
    }
}
