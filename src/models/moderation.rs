// src/models/moderation.rs

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Authors can pull their own post back out of the trash for this long.
pub const RESTORE_WINDOW_DAYS: i64 = 14;

/// Deletion-event actions the history filter accepts.
pub const HISTORY_ACTIONS: [&str; 4] = ["soft_delete", "admin_soft_hide", "hard_delete", "admin_hard_delete"];
pub const HISTORY_ACTOR_KINDS: [&str; 3] = ["user", "admin", "system"];

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default().trim().to_string())
}

/// Body of the soft-delete and purge endpoints.
#[derive(Debug, Deserialize, Validate)]
pub struct ModeratePostRequest {
    pub post_id: Uuid,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 500, message = "חייבים לציין סיבה (בין 3 ל-500 תווים)."))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RestorePostRequest {
    pub post_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BanUserRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub is_banned: bool,
    #[validate(length(max = 500, message = "Reason is too long."))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserStatusQuery {
    pub user_id: Uuid,
}

/// The fields moderation needs from a post row.
#[derive(Debug, Clone, FromRow)]
pub struct ModeratedPost {
    pub id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub channel_id: Option<String>,
    pub status: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub is_anonymous: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ModeratedPost {
    /// Payload of the `post_deleted` notification sent to the author.
    pub fn deletion_notice(&self, reason: &str, hard_delete: bool) -> Value {
        let mut payload = json!({
            "post_id": self.id,
            "post_title": self.title,
            "post_slug": self.slug,
            "reason": reason,
        });
        if hard_delete {
            payload["hard_delete"] = Value::Bool(true);
        }
        payload
    }

    /// What the post looked like, kept on the deletion event after the row is gone.
    pub fn snapshot(&self) -> Value {
        json!({
            "title": self.title,
            "slug": self.slug,
            "author_id": self.author_id,
            "channel_id": self.channel_id,
            "status": self.status,
            "published_at": self.published_at,
            "is_anonymous": self.is_anonymous,
            "created_at": self.created_at,
        })
    }
}

/// Whether a post deleted at `deleted_at` may still be restored by its author.
pub fn within_restore_window(deleted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    deleted_at >= now - Duration::days(RESTORE_WINDOW_DAYS)
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PostCounts {
    pub total: i64,
    pub published: i64,
    pub deleted: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UserCounts {
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ModerationStats {
    pub posts: PostCounts,
    pub users: UserCounts,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ModeratedUser {
    pub id: Uuid,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A user's `user_moderation` row. Absent rows read as the default (not suspended, not banned).
#[derive(Debug, Default, Serialize, FromRow, PartialEq, Eq)]
pub struct UserModeration {
    pub is_suspended: bool,
    pub reason: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub suspended_by: Option<Uuid>,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_at: Option<DateTime<Utc>>,
    pub banned_by: Option<Uuid>,
}

/// Query parameters of the deletion history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub action: Option<String>,
    pub actor_kind: Option<String>,
    /// Matches the snapshot's title or slug.
    pub q: Option<String>,
    /// Matches the author's display name.
    pub author: Option<String>,
    pub from: Option<NaiveDate>,
    /// Inclusive day.
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl HistoryParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Unknown actions are ignored rather than rejected.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref().filter(|a| HISTORY_ACTIONS.contains(a))
    }

    pub fn actor_kind(&self) -> Option<&str> {
        self.actor_kind.as_deref().filter(|k| HISTORY_ACTOR_KINDS.contains(k))
    }

    pub fn search(&self) -> Option<String> {
        like_pattern(self.q.as_deref())
    }

    pub fn author_search(&self) -> Option<String> {
        like_pattern(self.author.as_deref())
    }

    pub fn created_from(&self) -> Option<DateTime<Utc>> {
        self.from.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|d| d.and_utc())
    }

    /// Exclusive upper bound: midnight after `to`.
    pub fn created_before(&self) -> Option<DateTime<Utc>> {
        self.to
            .and_then(|d| d.succ_opt())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc())
    }
}

/// `%term%` for ILIKE, with the wildcard characters of `term` escaped.
fn like_pattern(term: Option<&str>) -> Option<String> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

/// A `deletion_events` row with the actor's and author's profiles resolved.
#[derive(Debug, Serialize, FromRow)]
pub struct DeletionEvent {
    pub id: String,
    pub action: String,
    pub actor_kind: Option<String>,
    pub actor_user_id: Option<Uuid>,
    pub target_post_id: Option<Uuid>,
    pub post_snapshot: Option<Value>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub actor_username: Option<String>,
    pub actor_display_name: Option<String>,
    pub author_username: Option<String>,
    pub author_display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::{Notification, NotificationKind, NotificationRow};
    use chrono::TimeZone;

    fn post() -> ModeratedPost {
        ModeratedPost {
            id: Uuid::from_u128(9),
            author_id: Some(Uuid::from_u128(2)),
            title: Some("טיוטה".into()),
            slug: Some("draft".into()),
            channel_id: Some("1".into()),
            status: Some("published".into()),
            published_at: None,
            is_anonymous: Some(false),
            created_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn reason_is_trimmed_before_length_check() {
        let req: ModeratePostRequest = serde_json::from_value(serde_json::json!({
            "post_id": Uuid::from_u128(9),
            "reason": "   ab   ",
        }))
        .unwrap();
        assert_eq!(req.reason, "ab");
        assert!(req.validate().is_err());

        let req: ModeratePostRequest = serde_json::from_value(serde_json::json!({
            "post_id": Uuid::from_u128(9),
            "reason": "ספאם",
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let req: ModeratePostRequest =
            serde_json::from_value(serde_json::json!({ "post_id": Uuid::from_u128(9) })).unwrap();
        assert!(req.validate().is_err());

        let req: ModeratePostRequest = serde_json::from_value(serde_json::json!({
            "post_id": Uuid::from_u128(9),
            "reason": "א".repeat(501),
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn deletion_notice_reads_back_as_post_deleted() {
        let row = NotificationRow {
            id: Uuid::from_u128(1),
            kind: "post_deleted".into(),
            entity_id: None,
            payload: Some(post().deletion_notice("ספאם", false)),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            actor_username: None,
            actor_display_name: None,
            actor_avatar_url: None,
        };
        let n = Notification::from(row);
        assert_eq!(
            n.kind,
            NotificationKind::PostDeleted { title: Some("טיוטה".into()), reason: Some("ספאם".into()) }
        );
        assert_eq!(n.group_key(), format!("post_deleted|{}|draft|טיוטה", Uuid::from_u128(9)));
    }

    #[test]
    fn purge_notice_is_flagged_hard() {
        assert_eq!(post().deletion_notice("x", true)["hard_delete"], true);
        assert!(post().deletion_notice("x", false).get("hard_delete").is_none());
        assert_eq!(post().snapshot()["author_id"], Uuid::from_u128(2).to_string());
    }

    #[test]
    fn restore_window_is_fourteen_days() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
        assert!(within_restore_window(now - Duration::days(14), now));
        assert!(within_restore_window(now - Duration::hours(1), now));
        assert!(!within_restore_window(now - Duration::days(14) - Duration::seconds(1), now));
    }

    #[test]
    fn history_params_clamp_and_filter() {
        let p = HistoryParams {
            action: Some("drop_table".into()),
            actor_kind: Some("admin".into()),
            q: Some(" 50%_off ".into()),
            author: Some("   ".into()),
            to: NaiveDate::from_ymd_opt(2024, 2, 29),
            limit: Some(1000),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.action(), None);
        assert_eq!(p.actor_kind(), Some("admin"));
        assert_eq!(p.search().as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(p.author_search(), None);
        assert_eq!(p.created_before(), Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
        assert_eq!(HistoryParams::default().limit(), 50);
    }
}
