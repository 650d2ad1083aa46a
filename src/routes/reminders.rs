use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{ReminderLogRepository, ReminderQueueRepository};
use crate::error::AppResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_reminders))
        .route("/log", get(list_log))
}

#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    pub id: String,
    pub assignment_uid: String,
    pub message: String,
    pub trigger_at: String,
    pub status: String,
    pub attempts: i32,
}

#[derive(Debug, Serialize)]
pub struct ReminderLogResponse {
    pub id: String,
    pub reminder_id: String,
    pub assignment_uid: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// The reminder queue, soonest trigger first.
async fn list_reminders(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<ReminderResponse>>> {
    let rows = ReminderQueueRepository::list(&state.db).await?;

    let reminders = rows
        .into_iter()
        .map(|r| ReminderResponse {
            id: r.id,
            assignment_uid: r.assignment_uid,
            message: r.message,
            trigger_at: DateTime::<Utc>::from_naive_utc_and_offset(r.trigger_at, Utc).to_rfc3339(),
            status: r.status,
            attempts: r.attempts,
        })
        .collect();

    Ok(Json(reminders))
}

/// Recent delivery outcomes, newest first.
async fn list_log(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<ReminderLogResponse>>> {
    let rows = ReminderLogRepository::list_recent(&state.db, 100).await?;

    let entries = rows
        .into_iter()
        .map(|e| ReminderLogResponse {
            id: e.id,
            reminder_id: e.reminder_id,
            assignment_uid: e.assignment_uid,
            status: e.status,
            error_message: e.error_message,
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(e.created_at, Utc).to_rfc3339(),
        })
        .collect();

    Ok(Json(entries))
}
