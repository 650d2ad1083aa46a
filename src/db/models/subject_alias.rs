use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User-chosen display name for a subject (category) code.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubjectAlias {
    pub category_code: String,
    pub display_name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
