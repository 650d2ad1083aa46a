use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::SubjectAlias;
use crate::error::{AppError, AppResult};

/// Repository for subject-code display names (`subject_aliases` table).
pub struct SubjectAliasRepository;

impl SubjectAliasRepository {
    /// Set the display name for a subject code, replacing any earlier one.
    pub async fn upsert(
        pool: &SqlitePool,
        category_code: &str,
        display_name: &str,
    ) -> AppResult<SubjectAlias> {
        let now = Utc::now().naive_utc();

        let record = sqlx::query_as::<_, SubjectAlias>(
            r#"
            INSERT INTO subject_aliases (category_code, display_name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(category_code) DO UPDATE SET
                display_name = excluded.display_name,
                updated_at = excluded.updated_at
            RETURNING
                category_code,
                display_name,
                created_at,
                updated_at
            "#,
        )
        .bind(category_code)
        .bind(display_name)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(record)
    }

    pub async fn find(pool: &SqlitePool, category_code: &str) -> AppResult<Option<SubjectAlias>> {
        let row = sqlx::query_as::<_, SubjectAlias>(
            r#"
            SELECT category_code, display_name, created_at, updated_at
            FROM subject_aliases
            WHERE category_code = ?
            "#,
        )
        .bind(category_code)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list(pool: &SqlitePool) -> AppResult<Vec<SubjectAlias>> {
        let rows = sqlx::query_as::<_, SubjectAlias>(
            r#"
            SELECT category_code, display_name, created_at, updated_at
            FROM subject_aliases
            ORDER BY category_code ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Remove the alias for a subject code. Idempotent.
    pub async fn delete(pool: &SqlitePool, category_code: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM subject_aliases WHERE category_code = ?")
            .bind(category_code)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;

    #[tokio::test]
    async fn alias_crud_round_trip() {
        let pool = test_support::pool().await;

        let created = SubjectAliasRepository::upsert(&pool, "HIST101", "History")
            .await
            .unwrap();
        assert_eq!(created.display_name, "History");

        let renamed = SubjectAliasRepository::upsert(&pool, "HIST101", "History of Europe")
            .await
            .unwrap();
        assert_eq!(renamed.display_name, "History of Europe");
        assert_eq!(SubjectAliasRepository::list(&pool).await.unwrap().len(), 1);

        SubjectAliasRepository::delete(&pool, "HIST101").await.unwrap();
        assert!(SubjectAliasRepository::find(&pool, "HIST101")
            .await
            .unwrap()
            .is_none());
        // Deleting a missing alias is fine.
        SubjectAliasRepository::delete(&pool, "HIST101").await.unwrap();
    }
}
