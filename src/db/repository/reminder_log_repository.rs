use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateReminderLogEntry, ReminderLogEntry};
use crate::error::{AppError, AppResult};

/// Repository for reminder delivery outcomes (`reminder_log` table).
pub struct ReminderLogRepository;

impl ReminderLogRepository {
    pub async fn create(
        pool: &SqlitePool,
        entry: CreateReminderLogEntry,
    ) -> AppResult<ReminderLogEntry> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, ReminderLogEntry>(
            r#"
            INSERT INTO reminder_log (
                id,
                reminder_id,
                assignment_uid,
                message,
                status,
                error_message,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING
                id,
                reminder_id,
                assignment_uid,
                message,
                status,
                error_message,
                created_at
            "#,
        )
        .bind(id)
        .bind(entry.reminder_id)
        .bind(entry.assignment_uid)
        .bind(entry.message)
        .bind(entry.status)
        .bind(entry.error_message)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Most recent delivery outcomes, newest first.
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> AppResult<Vec<ReminderLogEntry>> {
        let rows = sqlx::query_as::<_, ReminderLogEntry>(
            r#"
            SELECT
                id,
                reminder_id,
                assignment_uid,
                message,
                status,
                error_message,
                created_at
            FROM reminder_log
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}
