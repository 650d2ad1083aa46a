use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::FeedSettingsRepository;
use crate::error::{AppError, AppResult};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/feed",
        get(get_feed).put(update_feed).delete(delete_feed),
    )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateFeedRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct FeedSettingsResponse {
    pub feed_url: Option<String>,
    pub updated_at: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_feed(State(state): State<Arc<AppState>>) -> AppResult<Json<FeedSettingsResponse>> {
    let settings = FeedSettingsRepository::get(&state.db).await?;

    Ok(Json(FeedSettingsResponse {
        feed_url: settings.as_ref().and_then(|s| s.feed_url.clone()),
        updated_at: settings.map(|s| {
            DateTime::<Utc>::from_naive_utc_and_offset(s.updated_at, Utc).to_rfc3339()
        }),
    }))
}

/// Store the calendar feed URL. Only absolute http(s) URLs are accepted.
async fn update_feed(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateFeedRequest>,
) -> AppResult<Json<FeedSettingsResponse>> {
    let trimmed = request.url.trim();
    let parsed = url::Url::parse(trimmed)
        .map_err(|_| AppError::Validation("Feed URL is not a valid URL".to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::Validation(
            "Feed URL must use http or https".to_string(),
        ));
    }

    let settings = FeedSettingsRepository::set_url(&state.db, Some(trimmed)).await?;

    Ok(Json(FeedSettingsResponse {
        feed_url: settings.feed_url,
        updated_at: Some(
            DateTime::<Utc>::from_naive_utc_and_offset(settings.updated_at, Utc).to_rfc3339(),
        ),
    }))
}

async fn delete_feed(State(state): State<Arc<AppState>>) -> AppResult<Json<FeedSettingsResponse>> {
    let settings = FeedSettingsRepository::set_url(&state.db, None).await?;

    Ok(Json(FeedSettingsResponse {
        feed_url: settings.feed_url,
        updated_at: Some(
            DateTime::<Utc>::from_naive_utc_and_offset(settings.updated_at, Utc).to_rfc3339(),
        ),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::test_support;
    use crate::services::feed::FeedService;
    use crate::services::reminders::{LogSink, ReminderSink};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_state() -> Arc<AppState> {
        let config = Config::default();
        let feed = FeedService::new(&config).unwrap();
        let sink: Arc<dyn ReminderSink> = Arc::new(LogSink);
        Arc::new(AppState {
            db: test_support::pool().await,
            config,
            feed,
            reminder_sink: sink,
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn feed_url_round_trip() {
        let state = test_state().await;
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/feed")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"url": "https://example.com/export.ics"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/feed").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["feed_url"], "https://example.com/export.ics");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/feed")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/feed").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert!(body["feed_url"].is_null());
    }

    #[tokio::test]
    async fn invalid_urls_are_rejected() {
        let state = test_state().await;
        let app = router().with_state(state);

        for bad in [r#"{"url": "not a url"}"#, r#"{"url": "ftp://example.com/x"}"#] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("PUT")
                        .uri("/feed")
                        .header("content-type", "application/json")
                        .body(Body::from(bad))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }
}
