use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};

/// Repository for the persisted completion-id set
/// (`completed_assignments` table).
///
/// Rows are keyed by the assignment uid and are never pruned, so
/// completion state survives re-syncs and assignments temporarily
/// vanishing from the feed.
pub struct CompletionRepository;

impl CompletionRepository {
    pub async fn is_completed(pool: &SqlitePool, uid: &str) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM completed_assignments WHERE uid = ?",
        )
        .bind(uid)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(count > 0)
    }

    /// Mark an assignment completed. Idempotent.
    pub async fn set_completed(pool: &SqlitePool, uid: &str) -> AppResult<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO completed_assignments (uid, completed_at)
            VALUES (?, ?)
            ON CONFLICT(uid) DO NOTHING
            "#,
        )
        .bind(uid)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Remove an assignment from the completed set. Idempotent.
    pub async fn clear_completed(pool: &SqlitePool, uid: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM completed_assignments WHERE uid = ?")
            .bind(uid)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    /// All completed assignment uids.
    pub async fn list(pool: &SqlitePool) -> AppResult<Vec<String>> {
        let uids =
            sqlx::query_scalar::<_, String>("SELECT uid FROM completed_assignments ORDER BY uid")
                .fetch_all(pool)
                .await
                .map_err(AppError::Database)?;
        Ok(uids)
    }
}
