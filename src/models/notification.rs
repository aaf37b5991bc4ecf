// src/models/notification.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Display name for notifications emitted by the site itself.
pub const SYSTEM_DISPLAY_NAME: &str = "מערכת האתר";

/// Placeholder used when no actor name is known.
pub const UNKNOWN_ACTOR: &str = "מישהו";

/// Row of the `notifications` table joined with the actor's profile.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub entity_id: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub actor_username: Option<String>,
    pub actor_display_name: Option<String>,
    pub actor_avatar_url: Option<String>,
}

/// Query parameters for listing notifications.
#[derive(Debug, Deserialize, Validate)]
pub struct NotificationListParams {
    #[validate(range(min = 1, max = 200, message = "limit must be between 1 and 200"))]
    pub limit: Option<i64>,
}

/// The post a notification points at, as far as the payload tells.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PostRef {
    pub post_id: Option<String>,
    pub slug: Option<String>,
    pub title: Option<String>,
}

/// What a notification is about.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    NewPost { post: PostRef },
    Reaction { post: PostRef },
    Comment { post: PostRef },
    CommentLike { post: PostRef },
    SystemMessage { title: Option<String>, message: Option<String> },
    PostDeleted { title: Option<String>, reason: Option<String> },
    Other { action: String, post: PostRef },
}

impl NotificationKind {
    /// Emitted by the site rather than by another user.
    pub fn is_system(&self) -> bool {
        matches!(self, Self::SystemMessage { .. } | Self::PostDeleted { .. })
    }

    pub fn post(&self) -> Option<&PostRef> {
        match self {
            Self::NewPost { post }
            | Self::Reaction { post }
            | Self::Comment { post }
            | Self::CommentLike { post }
            | Self::Other { post, .. } => Some(post),
            Self::SystemMessage { .. } | Self::PostDeleted { .. } => None,
        }
    }

    /// In-app link for kinds that point at a known post.
    pub fn link(&self) -> Option<String> {
        match self {
            Self::Other { .. } => None,
            _ => self
                .post()
                .and_then(|p| p.slug.as_deref())
                .map(|slug| format!("/post/{slug}")),
        }
    }
}

/// Keeps string values only; anything else reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

#[derive(Debug, Default, Deserialize)]
struct PayloadPost {
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
}

fn lenient_post<'de, D>(deserializer: D) -> Result<Option<PayloadPost>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Known payload keys. The payload is free-form JSON written by database triggers.
#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default, deserialize_with = "lenient_string")]
    action: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    post_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    entity_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    post_slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    post_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_post")]
    post: Option<PayloadPost>,
    #[serde(default, deserialize_with = "lenient_string")]
    message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    actor_display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    actor_username: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    from_user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    from_user_display_name: Option<String>,
}

impl Payload {
    fn parse(raw: Option<&serde_json::Value>) -> Self {
        raw.filter(|v| v.is_object())
            .and_then(|v| Payload::deserialize(v).ok())
            .unwrap_or_default()
    }

    fn title(&self) -> Option<String> {
        non_empty(&self.post_title)
            .or_else(|| non_empty(&self.title))
            .or_else(|| self.post.as_ref().and_then(|p| non_empty(&p.title)))
    }

    fn post_id(&self) -> Option<String> {
        non_empty(&self.post_id).or_else(|| non_empty(&self.entity_id))
    }

    fn slug(&self) -> Option<String> {
        non_empty(&self.post_slug)
    }

    fn actor(&self) -> Option<String> {
        [
            &self.actor_display_name,
            &self.actor_username,
            &self.from_user_name,
            &self.from_user_display_name,
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .cloned()
    }
}

/// A notification row with its payload resolved into a typed kind.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: NotificationKind,
    pub actor_name: Option<String>,
    pub actor_username: Option<String>,
    pub actor_avatar_url: Option<String>,
    /// `type|post id|slug|title`, all read from the payload.
    #[serde(skip)]
    group_key: String,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let payload = Payload::parse(row.payload.as_ref());
        let action = payload.action.clone().unwrap_or(row.kind);

        let group_key = [
            action.as_str(),
            payload.post_id().as_deref().unwrap_or(""),
            payload.slug().as_deref().unwrap_or(""),
            payload.title().as_deref().unwrap_or(""),
        ]
        .join("|");

        let post = PostRef {
            post_id: payload.post_id().or_else(|| non_empty(&row.entity_id)),
            slug: payload.slug(),
            title: payload.title(),
        };

        let kind = match action.as_str() {
            "new_post" => NotificationKind::NewPost { post },
            "reaction" => NotificationKind::Reaction { post },
            "comment" => NotificationKind::Comment { post },
            "comment_like" => NotificationKind::CommentLike { post },
            "system_message" => NotificationKind::SystemMessage {
                title: post.title,
                message: non_empty(&payload.message),
            },
            "post_deleted" => NotificationKind::PostDeleted {
                title: post.title,
                reason: non_empty(&payload.reason),
            },
            _ => NotificationKind::Other {
                action: action.clone(),
                post,
            },
        };

        let actor_name = non_empty(&row.actor_display_name)
            .or_else(|| non_empty(&row.actor_username))
            .or_else(|| payload.actor());

        Self {
            id: row.id,
            created_at: row.created_at,
            kind,
            actor_name,
            actor_username: non_empty(&row.actor_username),
            actor_avatar_url: non_empty(&row.actor_avatar_url),
            group_key,
        }
    }
}

impl Notification {
    /// Notifications about the same thing collapse into one group.
    pub fn group_key(&self) -> &str {
        &self.group_key
    }
}

/// Several notifications about the same post and action.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationGroup {
    pub key: String,
    #[serde(flatten)]
    pub kind: NotificationKind,
    /// Newest row in the group.
    pub created_at: DateTime<Utc>,
    pub count: usize,
    pub actors: String,
    pub actor_avatar_url: Option<String>,
    pub link: Option<String>,
    pub notification_ids: Vec<Uuid>,
}

/// "A", "A ו-B", "A ועוד N" over distinct names in first-seen order.
pub fn summarize_actors(names: &[String]) -> String {
    let mut unique: Vec<&str> = Vec::new();
    for name in names.iter().map(String::as_str).filter(|n| !n.is_empty()) {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    match unique.as_slice() {
        [] => UNKNOWN_ACTOR.to_string(),
        [one] => one.to_string(),
        [a, b] => format!("{a} ו-{b}"),
        [first, rest @ ..] => format!("{first} ועוד {}", rest.len()),
    }
}

/// Groups notifications by `group_key`, newest group first.
pub fn group(notifications: Vec<Notification>) -> Vec<NotificationGroup> {
    struct Acc {
        first: Notification,
        created_at: DateTime<Utc>,
        names: Vec<String>,
        avatar: Option<String>,
        ids: Vec<Uuid>,
    }

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Acc> = HashMap::new();

    for n in notifications {
        let key = n.group_key().to_string();
        match groups.get_mut(&key) {
            Some(acc) => {
                acc.created_at = acc.created_at.max(n.created_at);
                acc.names.extend(n.actor_name.clone());
                if acc.avatar.is_none() {
                    acc.avatar = n.actor_avatar_url.clone();
                }
                acc.ids.push(n.id);
            }
            None => {
                order.push(key.clone());
                groups.insert(
                    key,
                    Acc {
                        created_at: n.created_at,
                        names: n.actor_name.clone().into_iter().collect(),
                        avatar: n.actor_avatar_url.clone(),
                        ids: vec![n.id],
                        first: n,
                    },
                );
            }
        }
    }

    let mut out: Vec<NotificationGroup> = order
        .into_iter()
        .filter_map(|key| {
            let acc = groups.remove(&key)?;
            let actors = if acc.first.kind.is_system() {
                SYSTEM_DISPLAY_NAME.to_string()
            } else {
                summarize_actors(&acc.names)
            };
            Some(NotificationGroup {
                link: acc.first.kind.link(),
                kind: acc.first.kind,
                created_at: acc.created_at,
                count: acc.ids.len(),
                actors,
                actor_avatar_url: acc.avatar,
                notification_ids: acc.ids,
                key,
            })
        })
        .collect();

    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}
