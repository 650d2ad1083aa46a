use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::{Assignment, AssignmentWithStatus, UpsertAssignment};
use crate::error::{AppError, AppResult};

/// Repository for feed-mirrored assignments (`assignments` table).
pub struct AssignmentRepository;

impl AssignmentRepository {
    /// Create or update an assignment identified by its feed uid and
    /// refresh its sync timestamp.
    pub async fn upsert(pool: &SqlitePool, create: UpsertAssignment) -> AppResult<Assignment> {
        let now = Utc::now().naive_utc();

        let record = sqlx::query_as::<_, Assignment>(
            r#"
            INSERT INTO assignments (
                uid,
                title,
                category_code,
                deadline,
                last_synced_at,
                created_at,
                updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(uid) DO UPDATE SET
                title = excluded.title,
                category_code = excluded.category_code,
                deadline = excluded.deadline,
                last_synced_at = excluded.last_synced_at,
                updated_at = excluded.updated_at
            RETURNING
                uid,
                title,
                category_code,
                deadline,
                last_synced_at,
                created_at,
                updated_at
            "#,
        )
        .bind(create.uid)
        .bind(create.title)
        .bind(create.category_code)
        .bind(create.deadline)
        .bind(now)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(record)
    }

    /// Find a single assignment by its feed uid.
    pub async fn find_by_uid(pool: &SqlitePool, uid: &str) -> AppResult<Option<Assignment>> {
        let row = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT
                uid,
                title,
                category_code,
                deadline,
                last_synced_at,
                created_at,
                updated_at
            FROM assignments
            WHERE uid = ?
            "#,
        )
        .bind(uid)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// All assignments, used by the sync cleanup pass.
    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT
                uid,
                title,
                category_code,
                deadline,
                last_synced_at,
                created_at,
                updated_at
            FROM assignments
            ORDER BY deadline ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// All assignments ascending by deadline, each joined with its
    /// completion state and the alias display name of its subject code.
    pub async fn list_with_status(pool: &SqlitePool) -> AppResult<Vec<AssignmentWithStatus>> {
        let rows = sqlx::query_as::<_, AssignmentWithStatus>(
            r#"
            SELECT
                a.uid,
                a.title,
                a.category_code,
                COALESCE(s.display_name, a.category_code) AS subject,
                a.deadline,
                c.uid IS NOT NULL AS is_completed
            FROM assignments a
            LEFT JOIN completed_assignments c ON c.uid = a.uid
            LEFT JOIN subject_aliases s ON s.category_code = a.category_code
            ORDER BY a.deadline ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Distinct non-empty subject codes currently present in the feed.
    pub async fn distinct_category_codes(pool: &SqlitePool) -> AppResult<Vec<String>> {
        let codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT category_code
            FROM assignments
            WHERE category_code != ''
            ORDER BY category_code ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(codes)
    }

    /// Delete an assignment that disappeared from the feed.
    pub async fn delete(pool: &SqlitePool, uid: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM assignments WHERE uid = ?")
            .bind(uid)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM assignments")
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(count)
    }

    /// Most recent sync timestamp across all assignments, if any.
    pub async fn last_synced_at(pool: &SqlitePool) -> AppResult<Option<NaiveDateTime>> {
        let last = sqlx::query_scalar::<_, Option<NaiveDateTime>>(
            "SELECT MAX(last_synced_at) FROM assignments",
        )
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;
    use chrono::NaiveDate;

    fn deadline(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap()
    }

    fn upsert(uid: &str, title: &str, code: &str, day: u32) -> UpsertAssignment {
        UpsertAssignment {
            uid: uid.to_string(),
            title: title.to_string(),
            category_code: code.to_string(),
            deadline: deadline(day),
        }
    }

    #[tokio::test]
    async fn upsert_updates_existing_rows_in_place() {
        let pool = test_support::pool().await;

        let first = AssignmentRepository::upsert(&pool, upsert("a1", "Draft", "HIST101", 10))
            .await
            .unwrap();
        let second = AssignmentRepository::upsert(&pool, upsert("a1", "Final", "HIST101", 12))
            .await
            .unwrap();

        assert_eq!(second.uid, first.uid);
        assert_eq!(second.title, "Final");
        assert_eq!(second.deadline, deadline(12));
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(AssignmentRepository::count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_with_status_joins_completion_and_aliases() {
        let pool = test_support::pool().await;

        AssignmentRepository::upsert(&pool, upsert("a1", "Essay", "HIST101", 10))
            .await
            .unwrap();
        AssignmentRepository::upsert(&pool, upsert("a2", "Problems", "MATH201", 12))
            .await
            .unwrap();

        crate::db::CompletionRepository::set_completed(&pool, "a2")
            .await
            .unwrap();
        crate::db::SubjectAliasRepository::upsert(&pool, "HIST101", "History of Europe")
            .await
            .unwrap();

        let rows = AssignmentRepository::list_with_status(&pool).await.unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].uid, "a1");
        assert_eq!(rows[0].subject, "History of Europe");
        assert!(!rows[0].is_completed);

        assert_eq!(rows[1].uid, "a2");
        assert_eq!(rows[1].subject, "MATH201");
        assert!(rows[1].is_completed);
    }

    #[tokio::test]
    async fn distinct_codes_skip_empty_categories() {
        let pool = test_support::pool().await;

        AssignmentRepository::upsert(&pool, upsert("a1", "One", "HIST101", 10))
            .await
            .unwrap();
        AssignmentRepository::upsert(&pool, upsert("a2", "Two", "HIST101", 11))
            .await
            .unwrap();
        AssignmentRepository::upsert(&pool, upsert("a3", "Three", "", 12))
            .await
            .unwrap();

        let codes = AssignmentRepository::distinct_category_codes(&pool)
            .await
            .unwrap();
        assert_eq!(codes, vec!["HIST101".to_string()]);
    }

    #[tokio::test]
    async fn delete_removes_only_the_given_uid() {
        let pool = test_support::pool().await;

        AssignmentRepository::upsert(&pool, upsert("a1", "One", "", 10))
            .await
            .unwrap();
        AssignmentRepository::upsert(&pool, upsert("a2", "Two", "", 11))
            .await
            .unwrap();

        AssignmentRepository::delete(&pool, "a1").await.unwrap();

        assert!(AssignmentRepository::find_by_uid(&pool, "a1")
            .await
            .unwrap()
            .is_none());
        assert!(AssignmentRepository::find_by_uid(&pool, "a2")
            .await
            .unwrap()
            .is_some());
    }
}
