use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::{Reminder, ScheduleReminder};
use crate::error::{AppError, AppResult};

/// Repository for scheduled deadline reminders (`reminder_queue` table).
///
/// Implementation notes:
/// - Reminder ids are deterministic (assignment uid + offset suffix), so
///   scheduling is an upsert that also resets retry bookkeeping.
/// - Claiming uses an atomic single-statement UPDATE with a subselect:
///   `UPDATE ... WHERE id = (SELECT id FROM ... LIMIT 1) RETURNING ...`
///   This avoids a long-lived transaction and reduces contention on SQLite.
pub struct ReminderQueueRepository;

impl ReminderQueueRepository {
    /// Schedule a reminder, replacing any earlier schedule under the same
    /// id. Attempts, errors and status are reset so a re-scheduled
    /// reminder starts fresh.
    pub async fn schedule(pool: &SqlitePool, schedule: ScheduleReminder) -> AppResult<Reminder> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Reminder>(
            r#"
            INSERT INTO reminder_queue (
                id,
                assignment_uid,
                title,
                message,
                trigger_at,
                attempts,
                max_attempts,
                next_attempt_at,
                last_error,
                status,
                created_at,
                updated_at
            )
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, NULL, 'pending', ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                message = excluded.message,
                trigger_at = excluded.trigger_at,
                attempts = 0,
                max_attempts = excluded.max_attempts,
                next_attempt_at = excluded.next_attempt_at,
                last_error = NULL,
                status = 'pending',
                updated_at = excluded.updated_at
            RETURNING
                id,
                assignment_uid,
                title,
                message,
                trigger_at,
                attempts,
                max_attempts,
                next_attempt_at,
                last_error,
                status,
                created_at,
                updated_at
            "#,
        )
        .bind(&schedule.id)
        .bind(&schedule.assignment_uid)
        .bind(&schedule.title)
        .bind(&schedule.message)
        .bind(schedule.trigger_at)
        .bind(schedule.max_attempts)
        .bind(schedule.trigger_at)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Cancel all pending reminders for an assignment.
    pub async fn cancel_for_assignment(pool: &SqlitePool, assignment_uid: &str) -> AppResult<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE reminder_queue
            SET status = 'cancelled', updated_at = ?
            WHERE assignment_uid = ? AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(assignment_uid)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Claim up to `limit` due reminders and return them.
    ///
    /// Each claim is a single atomic statement so other writers are never
    /// blocked by a long transaction.
    pub async fn claim_due(pool: &SqlitePool, limit: i64) -> AppResult<Vec<Reminder>> {
        let mut reminders: Vec<Reminder> = Vec::new();
        if limit <= 0 {
            return Ok(reminders);
        }

        for _ in 0..(limit as usize) {
            let now = Utc::now().naive_utc();

            let opt = sqlx::query_as::<_, Reminder>(
                r#"
                UPDATE reminder_queue
                SET status = 'processing', updated_at = ?
                WHERE id = (
                    SELECT id FROM reminder_queue
                    WHERE status = 'pending'
                      AND next_attempt_at <= ?
                    ORDER BY next_attempt_at ASC
                    LIMIT 1
                )
                RETURNING
                    id,
                    assignment_uid,
                    title,
                    message,
                    trigger_at,
                    attempts,
                    max_attempts,
                    next_attempt_at,
                    last_error,
                    status,
                    created_at,
                    updated_at
                "#,
            )
            .bind(now)
            .bind(now)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

            if let Some(reminder) = opt {
                reminders.push(reminder);
            } else {
                break;
            }
        }

        Ok(reminders)
    }

    /// Mark a reminder as delivered.
    pub async fn mark_sent(pool: &SqlitePool, id: &str) -> AppResult<Reminder> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Reminder>(
            r#"
            UPDATE reminder_queue
            SET status = 'sent', updated_at = ?
            WHERE id = ?
            RETURNING
                id,
                assignment_uid,
                title,
                message,
                trigger_at,
                attempts,
                max_attempts,
                next_attempt_at,
                last_error,
                status,
                created_at,
                updated_at
            "#,
        )
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Record a failed delivery attempt and schedule the next one. When the
    /// new attempt count reaches `max_attempts` the reminder moves to
    /// 'dead' instead.
    pub async fn register_attempt_and_schedule(
        pool: &SqlitePool,
        id: &str,
        next_attempt_at: NaiveDateTime,
        last_error: Option<String>,
    ) -> AppResult<Reminder> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Reminder>(
            r#"
            UPDATE reminder_queue
            SET
                attempts = attempts + 1,
                next_attempt_at = ?,
                last_error = ?,
                status = CASE WHEN attempts + 1 >= max_attempts THEN 'dead' ELSE 'pending' END,
                updated_at = ?
            WHERE id = ?
            RETURNING
                id,
                assignment_uid,
                title,
                message,
                trigger_at,
                attempts,
                max_attempts,
                next_attempt_at,
                last_error,
                status,
                created_at,
                updated_at
            "#,
        )
        .bind(next_attempt_at)
        .bind(last_error)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// All reminders, soonest trigger first.
    pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT
                id,
                assignment_uid,
                title,
                message,
                trigger_at,
                attempts,
                max_attempts,
                next_attempt_at,
                last_error,
                status,
                created_at,
                updated_at
            FROM reminder_queue
            ORDER BY trigger_at ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Pending reminders for one assignment.
    pub async fn pending_for_assignment(
        pool: &SqlitePool,
        assignment_uid: &str,
    ) -> AppResult<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT
                id,
                assignment_uid,
                title,
                message,
                trigger_at,
                attempts,
                max_attempts,
                next_attempt_at,
                last_error,
                status,
                created_at,
                updated_at
            FROM reminder_queue
            WHERE assignment_uid = ? AND status = 'pending'
            ORDER BY trigger_at ASC
            "#,
        )
        .bind(assignment_uid)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;
    use chrono::Duration;

    fn schedule(id: &str, uid: &str, trigger_at: NaiveDateTime) -> ScheduleReminder {
        ScheduleReminder {
            id: id.to_string(),
            assignment_uid: uid.to_string(),
            title: "Essay".to_string(),
            message: "Essay: due soon".to_string(),
            trigger_at,
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn scheduling_twice_resets_retry_state() {
        let pool = test_support::pool().await;
        let trigger = Utc::now().naive_utc() + Duration::hours(2);

        ReminderQueueRepository::schedule(&pool, schedule("a1_24h", "a1", trigger))
            .await
            .unwrap();
        ReminderQueueRepository::register_attempt_and_schedule(
            &pool,
            "a1_24h",
            trigger,
            Some("boom".to_string()),
        )
        .await
        .unwrap();

        let rescheduled = ReminderQueueRepository::schedule(&pool, schedule("a1_24h", "a1", trigger))
            .await
            .unwrap();
        assert_eq!(rescheduled.attempts, 0);
        assert_eq!(rescheduled.status, "pending");
        assert!(rescheduled.last_error.is_none());
        assert_eq!(ReminderQueueRepository::list(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claim_due_skips_future_and_cancelled_reminders() {
        let pool = test_support::pool().await;
        let now = Utc::now().naive_utc();

        ReminderQueueRepository::schedule(&pool, schedule("due_24h", "due", now - Duration::minutes(5)))
            .await
            .unwrap();
        ReminderQueueRepository::schedule(&pool, schedule("future_24h", "future", now + Duration::hours(5)))
            .await
            .unwrap();
        ReminderQueueRepository::schedule(&pool, schedule("gone_24h", "gone", now - Duration::minutes(5)))
            .await
            .unwrap();
        ReminderQueueRepository::cancel_for_assignment(&pool, "gone")
            .await
            .unwrap();

        let claimed = ReminderQueueRepository::claim_due(&pool, 10).await.unwrap();
        let ids: Vec<&str> = claimed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["due_24h"]);
        assert_eq!(claimed[0].status, "processing");

        // A second poll finds nothing new.
        assert!(ReminderQueueRepository::claim_due(&pool, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn exhausted_attempts_move_the_reminder_to_dead() {
        let pool = test_support::pool().await;
        let now = Utc::now().naive_utc();

        let mut reminder =
            ReminderQueueRepository::schedule(&pool, schedule("a1_1h", "a1", now)).await.unwrap();

        for _ in 0..reminder.max_attempts {
            reminder = ReminderQueueRepository::register_attempt_and_schedule(
                &pool,
                "a1_1h",
                now + Duration::minutes(1),
                Some("unreachable".to_string()),
            )
            .await
            .unwrap();
        }

        assert_eq!(reminder.status, "dead");
        assert_eq!(reminder.attempts, reminder.max_attempts);
        assert_eq!(reminder.last_error.as_deref(), Some("unreachable"));
    }
}
