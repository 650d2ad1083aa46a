use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};

const CALENDAR_ENVELOPE: &str = "BEGIN:VCALENDAR";
const EVENT_MARKER: &str = "BEGIN:VEVENT";

/// HTTP client for the user's calendar feed.
///
/// The fetch validates that the response looks like a calendar document
/// (envelope marker plus at least one event marker) before the text is
/// handed to the parser; the parser itself treats any input as best-effort
/// and never fails, so malformed-content errors must be raised here.
#[derive(Clone)]
pub struct FeedService {
    client: reqwest::Client,
}

impl FeedService {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.feed.fetch_timeout_seconds))
            .build()
            .map_err(|e| AppError::Feed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> AppResult<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/calendar")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Feed(format!(
                "Feed request failed (HTTP {})",
                status.as_u16()
            )));
        }

        let body = response.text().await?;

        if !body.contains(CALENDAR_ENVELOPE) {
            return Err(AppError::Feed(
                "Response is missing the calendar envelope".to_string(),
            ));
        }
        if !body.contains(EVENT_MARKER) {
            return Err(AppError::Feed("Calendar contains no events".to_string()));
        }

        Ok(body)
    }
}
