use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Single-row settings table holding the calendar feed URL.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FeedSettings {
    pub id: i64,
    pub feed_url: Option<String>,
    pub updated_at: NaiveDateTime,
}
