use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::SqlitePool;

use crate::config::ReminderConfig;
use crate::db::{
    CreateReminderLogEntry, Reminder, ReminderLogRepository, ReminderQueueRepository,
    ScheduleReminder,
};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Fixed lead times for deadline reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOffset {
    DayBefore,
    HourBefore,
}

impl ReminderOffset {
    pub const ALL: [ReminderOffset; 2] = [ReminderOffset::DayBefore, ReminderOffset::HourBefore];

    /// Suffix appended to the assignment uid to form the reminder id.
    pub fn suffix(&self) -> &'static str {
        match self {
            ReminderOffset::DayBefore => "_24h",
            ReminderOffset::HourBefore => "_1h",
        }
    }

    pub fn lead(&self) -> Duration {
        match self {
            ReminderOffset::DayBefore => Duration::hours(24),
            ReminderOffset::HourBefore => Duration::hours(1),
        }
    }

    pub fn reminder_id(&self, assignment_uid: &str) -> String {
        format!("{}{}", assignment_uid, self.suffix())
    }

    pub fn message(&self, title: &str) -> String {
        match self {
            ReminderOffset::DayBefore => format!("📚 {}: due in 24 hours", title),
            ReminderOffset::HourBefore => format!("⚠️ {}: due in 1 hour!", title),
        }
    }
}

/// Delivery target for due reminders. Chosen once at startup and never
/// swapped afterwards.
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn deliver(&self, reminder: &Reminder) -> AppResult<()>;
}

/// POSTs due reminders to a configured webhook as a JSON payload.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(10))
            .build()
            .map_err(|e| AppError::Delivery(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl ReminderSink for WebhookSink {
    async fn deliver(&self, reminder: &Reminder) -> AppResult<()> {
        let payload = serde_json::json!({
            "reminder_id": reminder.id,
            "assignment_uid": reminder.assignment_uid,
            "title": reminder.title,
            "content": reminder.message,
            "trigger_at": DateTime::<Utc>::from_naive_utc_and_offset(reminder.trigger_at, Utc)
                .to_rfc3339(),
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Delivery(format!(
                "Webhook returned HTTP {}",
                status.as_u16()
            )));
        }

        Ok(())
    }
}

/// Writes due reminders to the log instead of delivering them externally.
pub struct LogSink;

#[async_trait]
impl ReminderSink for LogSink {
    async fn deliver(&self, reminder: &Reminder) -> AppResult<()> {
        tracing::info!(
            "Reminder due for assignment {}: {}",
            reminder.assignment_uid,
            reminder.message
        );
        Ok(())
    }
}

/// Service for scheduling and dispatching deadline reminders.
pub struct ReminderService {
    pool: SqlitePool,
    sink: Arc<dyn ReminderSink>,
    config: ReminderConfig,
}

impl ReminderService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            pool: state.db.clone(),
            sink: state.reminder_sink.clone(),
            config: state.config.reminders.clone(),
        }
    }

    /// Schedule both offset reminders for an assignment. Offsets whose
    /// trigger time has already passed are skipped, so assignments due
    /// within the next hour get no reminders at all. Returns the number
    /// of reminders scheduled.
    pub async fn schedule_for_assignment(
        &self,
        assignment_uid: &str,
        title: &str,
        deadline: NaiveDateTime,
    ) -> AppResult<usize> {
        let now = Utc::now().naive_utc();
        let mut scheduled = 0usize;

        for offset in ReminderOffset::ALL {
            let trigger_at = deadline - offset.lead();
            if trigger_at <= now {
                continue;
            }

            let schedule = ScheduleReminder {
                id: offset.reminder_id(assignment_uid),
                assignment_uid: assignment_uid.to_string(),
                title: title.to_string(),
                message: offset.message(title),
                trigger_at,
                max_attempts: self.config.max_attempts as i32,
            };

            ReminderQueueRepository::schedule(&self.pool, schedule).await?;
            scheduled += 1;
        }

        Ok(scheduled)
    }

    /// Cancel all pending reminders for an assignment (used when it is
    /// completed or disappears from the feed).
    pub async fn cancel_for_assignment(&self, assignment_uid: &str) -> AppResult<()> {
        ReminderQueueRepository::cancel_for_assignment(&self.pool, assignment_uid).await
    }

    /// Claim and deliver due reminders. Returns the number claimed.
    /// Delivery failures never propagate; they are retried with backoff
    /// and eventually moved to 'dead'.
    pub async fn process_due(&self) -> AppResult<usize> {
        let due =
            ReminderQueueRepository::claim_due(&self.pool, self.config.batch_size as i64).await?;
        let claimed = due.len();

        for reminder in due {
            self.dispatch(reminder).await;
        }

        Ok(claimed)
    }

    async fn dispatch(&self, reminder: Reminder) {
        match self.sink.deliver(&reminder).await {
            Ok(()) => {
                if let Err(e) = ReminderQueueRepository::mark_sent(&self.pool, &reminder.id).await {
                    tracing::warn!("Failed to mark reminder {} as sent: {:?}", reminder.id, e);
                }
                self.log_outcome(&reminder, "sent", None).await;
                tracing::info!("Reminder {} delivered", reminder.id);
            }
            Err(e) => {
                let err_str = e.to_string();

                // Compute delay = min(max_backoff, initial_backoff * 2^attempts)
                let cfg = &self.config;
                let attempts = reminder.attempts as u32;
                let mut delay: u64 = cfg.initial_backoff_seconds;
                for _ in 0..attempts {
                    delay = delay.saturating_mul(2);
                    if delay >= cfg.max_backoff_seconds {
                        delay = cfg.max_backoff_seconds;
                        break;
                    }
                }

                let next = Utc::now().naive_utc() + Duration::seconds(delay as i64);

                match ReminderQueueRepository::register_attempt_and_schedule(
                    &self.pool,
                    &reminder.id,
                    next,
                    Some(err_str.clone()),
                )
                .await
                {
                    Ok(updated) if updated.status == "dead" => {
                        self.log_outcome(&reminder, "failed", Some(&err_str)).await;
                        tracing::warn!(
                            "Reminder {} reached max attempts and was marked dead: {}",
                            reminder.id,
                            err_str
                        );
                    }
                    Ok(_) => {
                        tracing::info!(
                            "Reminder {} delivery failed, rescheduled: {}",
                            reminder.id,
                            err_str
                        );
                    }
                    Err(e2) => {
                        tracing::warn!("Failed to reschedule reminder {}: {:?}", reminder.id, e2);
                    }
                }
            }
        }
    }

    async fn log_outcome(&self, reminder: &Reminder, status: &str, error: Option<&str>) {
        let entry = CreateReminderLogEntry {
            reminder_id: reminder.id.clone(),
            assignment_uid: reminder.assignment_uid.clone(),
            message: reminder.message.clone(),
            status: status.to_string(),
            error_message: error.map(|s| s.to_string()),
        };

        if let Err(e) = ReminderLogRepository::create(&self.pool, entry).await {
            tracing::warn!(
                "Failed to record delivery outcome for reminder {}: {:?}",
                reminder.id,
                e
            );
        }
    }
}
