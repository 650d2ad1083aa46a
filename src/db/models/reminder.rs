use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A scheduled deadline reminder.
///
/// Ids are deterministic: the assignment uid plus a per-offset suffix
/// (`_24h`, `_1h`). Scheduling the same reminder twice therefore updates
/// the existing row, and cancellation needs no lookup.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub assignment_uid: String,
    pub title: String,
    /// Message rendered at scheduling time so a later title change does not
    /// alter an already-scheduled reminder.
    pub message: String,
    /// When the reminder should fire.
    pub trigger_at: NaiveDateTime,
    /// Delivery attempts already made.
    pub attempts: i32,
    pub max_attempts: i32,
    /// When the reminder next becomes eligible for delivery. Equals
    /// `trigger_at` initially; pushed out by retry backoff.
    pub next_attempt_at: NaiveDateTime,
    pub last_error: Option<String>,
    /// 'pending', 'processing', 'sent', 'cancelled' or 'dead'.
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Data required to schedule (or re-schedule) a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleReminder {
    pub id: String,
    pub assignment_uid: String,
    pub title: String,
    pub message: String,
    pub trigger_at: NaiveDateTime,
    pub max_attempts: i32,
}

/// Delivery outcome for a dispatched reminder.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReminderLogEntry {
    pub id: String,
    pub reminder_id: String,
    pub assignment_uid: String,
    pub message: String,
    /// 'sent' or 'failed'.
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReminderLogEntry {
    pub reminder_id: String,
    pub assignment_uid: String,
    pub message: String,
    pub status: String,
    pub error_message: Option<String>,
}
