use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::FeedSettings;
use crate::error::{AppError, AppResult};

/// Repository for the single-row feed settings (`feed_settings` table).
pub struct FeedSettingsRepository;

impl FeedSettingsRepository {
    pub async fn get(pool: &SqlitePool) -> AppResult<Option<FeedSettings>> {
        let row = sqlx::query_as::<_, FeedSettings>(
            "SELECT id, feed_url, updated_at FROM feed_settings WHERE id = 1",
        )
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Store (or clear, with `None`) the calendar feed URL.
    pub async fn set_url(pool: &SqlitePool, feed_url: Option<&str>) -> AppResult<FeedSettings> {
        let now = Utc::now().naive_utc();
        let owned = feed_url.map(|s| s.to_string());

        let record = sqlx::query_as::<_, FeedSettings>(
            r#"
            INSERT INTO feed_settings (id, feed_url, updated_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                feed_url = excluded.feed_url,
                updated_at = excluded.updated_at
            RETURNING id, feed_url, updated_at
            "#,
        )
        .bind(owned)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;

    #[tokio::test]
    async fn url_round_trip() {
        let pool = test_support::pool().await;

        assert!(FeedSettingsRepository::get(&pool).await.unwrap().is_none());

        let stored = FeedSettingsRepository::set_url(&pool, Some("https://example.com/cal.ics"))
            .await
            .unwrap();
        assert_eq!(
            stored.feed_url.as_deref(),
            Some("https://example.com/cal.ics")
        );

        let cleared = FeedSettingsRepository::set_url(&pool, None).await.unwrap();
        assert!(cleared.feed_url.is_none());
        // Still a single row after updates.
        assert!(FeedSettingsRepository::get(&pool).await.unwrap().is_some());
    }
}
