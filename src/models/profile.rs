// src/models/profile.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Compact profile shown when hovering an author's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserPreview {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub followers_count: i64,
}

/// Path parameters for the preview endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct PreviewPath {
    #[validate(length(min = 1, max = 50, message = "Username length must be between 1 and 50 characters."))]
    pub username: String,
}
