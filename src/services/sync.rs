use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::db::{
    AssignmentRepository, CompletionRepository, FeedSettingsRepository, UpsertAssignment,
};
use crate::error::AppResult;
use crate::services::reminders::ReminderService;
use crate::AppState;

/// Result of one synchronization pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SyncOutcome {
    /// Whether a feed URL was configured at all.
    pub configured: bool,
    /// Assignments written from the feed.
    pub synced: usize,
    /// Assignments removed because they vanished from the feed.
    pub removed: usize,
}

/// Feed synchronization:
///
/// - Fetches the configured calendar feed and parses it into assignment
///   records.
/// - Upserts assignment rows by uid.
/// - Schedules deadline reminders for assignments that are not completed,
///   and cancels reminders for completed ones.
/// - Removes rows (and their pending reminders) for events that no longer
///   exist in the feed.
pub struct SyncManager;

impl SyncManager {
    /// Run one synchronization pass. A missing feed URL is not an error;
    /// per-record failures are logged and skipped so one bad row never
    /// aborts the whole pass.
    pub async fn sync(state: &Arc<AppState>) -> AppResult<SyncOutcome> {
        let settings = FeedSettingsRepository::get(&state.db).await?;
        let url = match settings.and_then(|s| s.feed_url) {
            Some(u) => u,
            None => {
                info!("No feed URL configured; skipping synchronization");
                return Ok(SyncOutcome {
                    configured: false,
                    synced: 0,
                    removed: 0,
                });
            }
        };

        let body = state.feed.fetch(&url).await?;
        let records = crate::ics::parse_feed(&body);
        info!("Parsed {} assignments from feed", records.len());

        let reminders = ReminderService::new(state);
        let completed: HashSet<String> = CompletionRepository::list(&state.db)
            .await?
            .into_iter()
            .collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut synced = 0usize;

        for record in records {
            seen.insert(record.uid.clone());

            let upsert = UpsertAssignment {
                uid: record.uid.clone(),
                title: record.title.clone(),
                category_code: record.category_code.clone(),
                deadline: record.deadline.naive_utc(),
            };

            let assignment = match AssignmentRepository::upsert(&state.db, upsert).await {
                Ok(a) => a,
                Err(e) => {
                    warn!("Failed to upsert assignment {}: {:?}", record.uid, e);
                    continue;
                }
            };
            synced += 1;

            if completed.contains(&assignment.uid) {
                if let Err(e) = reminders.cancel_for_assignment(&assignment.uid).await {
                    warn!(
                        "Failed to cancel reminders for completed assignment {}: {:?}",
                        assignment.uid, e
                    );
                }
            } else if let Err(e) = reminders
                .schedule_for_assignment(&assignment.uid, &assignment.title, assignment.deadline)
                .await
            {
                warn!(
                    "Failed to schedule reminders for assignment {}: {:?}",
                    assignment.uid, e
                );
            }
        }

        // Cleanup: remove rows for events that no longer exist in the feed.
        let mut removed = 0usize;
        let existing = AssignmentRepository::list_all(&state.db).await?;
        for row in existing {
            if seen.contains(&row.uid) {
                continue;
            }

            if let Err(e) = reminders.cancel_for_assignment(&row.uid).await {
                warn!(
                    "Failed to cancel reminders for removed assignment {}: {:?}",
                    row.uid, e
                );
            }

            match AssignmentRepository::delete(&state.db, &row.uid).await {
                Ok(_) => removed += 1,
                Err(e) => warn!("Failed to delete stale assignment {}: {:?}", row.uid, e),
            }
        }

        info!(
            "Feed synchronization complete: {} synced, {} removed",
            synced, removed
        );

        Ok(SyncOutcome {
            configured: true,
            synced,
            removed,
        })
    }
}
