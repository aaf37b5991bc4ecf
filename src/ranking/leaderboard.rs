// src/ranking/leaderboard.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::models::post::RankedPost;

/// Weekly medal tally for one writer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WriterScore {
    pub author_key: String,
    pub username: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
    pub total_reactions: u32,
    pub medal_score: u32,
}

impl WriterScore {
    fn medal_score(&self) -> u32 {
        self.gold * 3 + self.silver * 2 + self.bronze
    }
}

/// Ranks writers by medals received this week, then by total reactions.
/// Writers without any weekly reaction are left out.
pub fn writers_of_week(posts: &[RankedPost], size: usize) -> Vec<WriterScore> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut writers: Vec<WriterScore> = Vec::new();

    for p in posts {
        let key = p.post.author_key();
        let slot = *index.entry(key).or_insert_with(|| {
            writers.push(WriterScore {
                author_key: key.to_string(),
                username: p.post.author_username.clone(),
                display_name: p.author_name.clone(),
                avatar_url: None,
                gold: 0,
                silver: 0,
                bronze: 0,
                total_reactions: 0,
                medal_score: 0,
            });
            writers.len() - 1
        });

        let w = &mut writers[slot];
        w.gold += p.kind_count("gold");
        w.silver += p.kind_count("silver");
        w.bronze += p.kind_count("bronze");
        w.total_reactions += p.week_reactions;
        if w.avatar_url.is_none() {
            w.avatar_url = p
                .post
                .author_avatar_url
                .clone()
                .filter(|url| !url.trim().is_empty());
        }
    }

    for w in &mut writers {
        w.medal_score = w.medal_score();
    }

    writers.sort_by(|a, b| {
        b.medal_score
            .cmp(&a.medal_score)
            .then(b.total_reactions.cmp(&a.total_reactions))
            .then(b.gold.cmp(&a.gold))
            .then(b.silver.cmp(&a.silver))
            .then(b.bronze.cmp(&a.bronze))
    });

    writers
        .into_iter()
        .filter(|w| w.total_reactions > 0)
        .take(size)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::fixtures::post;

    fn ranked(n: u128, author: &str, kinds: &[(&str, u32)]) -> RankedPost {
        let mut r = RankedPost::new(post(n, "stories", author, n as i64));
        for (kind, count) in kinds {
            r.week_reactions_by_kind.insert(kind.to_string(), *count);
            r.week_reactions += count;
        }
        r
    }

    #[test]
    fn single_gold_scores_three() {
        let posts = vec![ranked(1, "dana", &[("gold", 1)]), ranked(2, "dana", &[])];
        let board = writers_of_week(&posts, 5);

        assert_eq!(board.len(), 1);
        let w = &board[0];
        assert_eq!(w.author_key, "dana");
        assert_eq!((w.gold, w.silver, w.bronze), (1, 0, 0));
        assert_eq!(w.total_reactions, 1);
        assert_eq!(w.medal_score, 3);
    }

    #[test]
    fn medals_outrank_plain_reactions() {
        let posts = vec![
            ranked(1, "noa", &[("funny", 10)]),
            ranked(2, "avi", &[("bronze", 1)]),
            ranked(3, "tal", &[("silver", 1)]),
            ranked(4, "tal", &[("bronze", 1)]),
        ];
        let keys: Vec<_> = writers_of_week(&posts, 5)
            .into_iter()
            .map(|w| w.author_key)
            .collect();
        assert_eq!(keys, ["tal", "avi", "noa"]);
    }

    #[test]
    fn equal_medal_score_breaks_on_reactions_then_gold() {
        let posts = vec![
            // medal score 3 each
            ranked(1, "silver-bronze", &[("silver", 1), ("bronze", 1)]),
            ranked(2, "gold", &[("gold", 1), ("funny", 1)]),
            ranked(3, "triple-bronze", &[("bronze", 3)]),
        ];
        let keys: Vec<_> = writers_of_week(&posts, 5)
            .into_iter()
            .map(|w| w.author_key)
            .collect();
        // triple-bronze has 3 reactions; gold beats silver-bronze on gold count
        assert_eq!(keys, ["triple-bronze", "gold", "silver-bronze"]);
    }

    #[test]
    fn excludes_silent_writers_and_caps_size() {
        let mut posts: Vec<_> = (1..=7)
            .map(|n| ranked(n, &format!("w{n}"), &[("moving", n as u32)]))
            .collect();
        posts.push(ranked(8, "quiet", &[]));

        let board = writers_of_week(&posts, 5);
        assert_eq!(board.len(), 5);
        assert!(board.iter().all(|w| w.author_key != "quiet"));
        assert_eq!(board[0].author_key, "w7");
    }

    #[test]
    fn keeps_first_avatar_seen() {
        let mut a = ranked(1, "dana", &[("gold", 1)]);
        let mut b = ranked(2, "dana", &[("gold", 1)]);
        a.post.author_avatar_url = None;
        b.post.author_avatar_url = Some("https://cdn/avatar.png".to_string());

        let board = writers_of_week(&[a, b], 5);
        assert_eq!(board[0].avatar_url.as_deref(), Some("https://cdn/avatar.png"));
        assert_eq!(board[0].medal_score, 6);
    }
}
