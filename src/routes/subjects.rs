use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::{AssignmentRepository, SubjectAliasRepository};
use crate::error::{AppError, AppResult};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_subjects))
        .route("/:code", axum::routing::put(set_alias).delete(delete_alias))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubjectResponse {
    pub category_code: String,
    /// Alias when set, otherwise the raw code.
    pub display_name: String,
    pub has_alias: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetAliasRequest {
    pub display_name: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Subject codes currently present in the feed, with alias names applied.
async fn list_subjects(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<SubjectResponse>>> {
    let codes = AssignmentRepository::distinct_category_codes(&state.db).await?;
    let aliases = SubjectAliasRepository::list(&state.db).await?;

    let subjects = codes
        .into_iter()
        .map(|code| {
            let alias = aliases
                .iter()
                .find(|a| a.category_code == code)
                .map(|a| a.display_name.clone());
            SubjectResponse {
                display_name: alias.clone().unwrap_or_else(|| code.clone()),
                has_alias: alias.is_some(),
                category_code: code,
            }
        })
        .collect();

    Ok(Json(subjects))
}

/// Set the display name for a subject code.
async fn set_alias(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(request): Json<SetAliasRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let display_name = request.display_name.trim();
    if display_name.is_empty() {
        return Err(AppError::Validation(
            "Display name must not be empty".to_string(),
        ));
    }

    let alias = SubjectAliasRepository::upsert(&state.db, &code, display_name).await?;

    Ok(Json(json!({
        "category_code": alias.category_code,
        "display_name": alias.display_name,
    })))
}

/// Remove the alias for a subject code; the raw code is shown again.
async fn delete_alias(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    SubjectAliasRepository::delete(&state.db, &code).await?;

    Ok(Json(json!({
        "category_code": code,
        "deleted": true,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{test_support, UpsertAssignment};
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
    async fn list_applies_aliases_to_known_codes() {
        let state = test_state().await;

        AssignmentRepository::upsert(
            &state.db,
            UpsertAssignment {
                uid: "a1".to_string(),
                title: "Essay".to_string(),
                category_code: "HIST101".to_string(),
                deadline: chrono::Utc::now().naive_utc(),
            },
        )
        .await
        .unwrap();
        SubjectAliasRepository::upsert(&state.db, "HIST101", "History")
            .await
            .unwrap();

        let app = router().with_state(state);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["category_code"], "HIST101");
        assert_eq!(rows[0]["display_name"], "History");
        assert_eq!(rows[0]["has_alias"], true);
    }

    #[tokio::test]
    async fn empty_display_name_is_rejected() {
        let state = test_state().await;
        let app = router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/HIST101")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"display_name": "   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn set_and_delete_alias_round_trip() {
        let state = test_state().await;
        let app = router().with_state(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/HIST101")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"display_name": "History"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(SubjectAliasRepository::find(&state.db, "HIST101")
            .await
            .unwrap()
            .is_some());

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/HIST101")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(SubjectAliasRepository::find(&state.db, "HIST101")
            .await
            .unwrap()
            .is_none());
    }
}
