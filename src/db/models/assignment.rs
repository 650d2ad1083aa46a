use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An assignment mirrored from the calendar feed. Timestamps are stored
/// as naive UTC.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub uid: String,
    pub title: String,
    pub category_code: String,
    pub deadline: NaiveDateTime,
    pub last_synced_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fields written on every sync; everything else is bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertAssignment {
    pub uid: String,
    pub title: String,
    pub category_code: String,
    pub deadline: NaiveDateTime,
}

/// Assignment row joined with completion state and the alias display name
/// for its subject code.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssignmentWithStatus {
    pub uid: String,
    pub title: String,
    pub category_code: String,
    pub subject: String,
    pub deadline: NaiveDateTime,
    pub is_completed: bool,
}
