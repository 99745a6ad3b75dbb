use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub category_name: String,
    pub scraping_session_id: i64,
    pub title: String,
    pub permalink: String,
    pub score: i64,
}

/// One stored photo, original or photoshop, as the read API consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhotoRow {
    pub post_id: i64,
    pub text: String,
    pub score: i64,
    pub stored_url: String,
    pub public_id: String,
    pub width: i64,
    pub height: i64,
    pub format: String,
    pub is_original: bool,
}
