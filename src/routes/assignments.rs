use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::db::{AssignmentRepository, CompletionRepository, FeedSettingsRepository};
use crate::error::{AppError, AppResult};
use crate::services::reminders::ReminderService;
use crate::services::sync::SyncManager;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_assignments))
        .route("/sync", post(sync_now))
        .route("/status", get(get_status))
        .route("/:uid/toggle", post(toggle_complete))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub uid: String,
    pub title: String,
    pub category_code: String,
    /// Alias display name when one is set, otherwise the raw subject code.
    pub subject: String,
    pub deadline: String,
    pub is_completed: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// All assignments ascending by deadline, with completion state and alias
/// names joined in.
async fn list_assignments(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<AssignmentResponse>>> {
    let rows = AssignmentRepository::list_with_status(&state.db).await?;

    let assignments = rows
        .into_iter()
        .map(|row| AssignmentResponse {
            uid: row.uid,
            title: row.title,
            category_code: row.category_code,
            subject: row.subject,
            deadline: DateTime::<Utc>::from_naive_utc_and_offset(row.deadline, Utc).to_rfc3339(),
            is_completed: row.is_completed,
        })
        .collect();

    Ok(Json(assignments))
}

/// Trigger a manual feed synchronization.
async fn sync_now(State(state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    let outcome = SyncManager::sync(&state).await?;

    Ok(Json(json!({
        "configured": outcome.configured,
        "synced": outcome.synced,
        "removed": outcome.removed,
    })))
}

/// Return a simple sync status: whether a feed URL is configured, the last
/// sync timestamp across assignments, and the total assignment count.
async fn get_status(State(state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    let configured = FeedSettingsRepository::get(&state.db)
        .await?
        .and_then(|s| s.feed_url)
        .is_some();

    let last_sync = AssignmentRepository::last_synced_at(&state.db)
        .await?
        .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339());

    let assignments_count = AssignmentRepository::count(&state.db).await?;

    Ok(Json(json!({
        "configured": configured,
        "last_sync": last_sync,
        "assignments_count": assignments_count,
    })))
}

/// Toggle an assignment's completion state.
///
/// Completing cancels its scheduled reminders; un-completing reschedules
/// them when the deadline is still ahead.
async fn toggle_complete(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let assignment = AssignmentRepository::find_by_uid(&state.db, &uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assignment {} not found", uid)))?;

    let reminders = ReminderService::new(&state);
    let was_completed = CompletionRepository::is_completed(&state.db, &uid).await?;

    if was_completed {
        CompletionRepository::clear_completed(&state.db, &uid).await?;
        reminders
            .schedule_for_assignment(&assignment.uid, &assignment.title, assignment.deadline)
            .await?;
    } else {
        CompletionRepository::set_completed(&state.db, &uid).await?;
        reminders.cancel_for_assignment(&uid).await?;
    }

    Ok(Json(json!({
        "uid": uid,
        "is_completed": !was_completed,
    })))
}
