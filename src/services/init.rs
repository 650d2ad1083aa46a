//! Initialization helpers for the application:
//! - database connection + migrations
//! - feed-URL seeding from the environment
//! - background worker spawn helpers
//!
//! This module centralizes bits that would otherwise live in `main.rs`.

use std::{path::Path, sync::Arc};

use anyhow::Result;

use crate::config::Config;
use crate::db::FeedSettingsRepository;

/// Redact potentially sensitive information from a database URL before logging.
///
/// Attempts to parse the URL and remove userinfo (username:password)
/// components. Falls back to removing everything before '@' or returning
/// "(redacted)".
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = url.path();
        format!("{}://{}{}{}", scheme, host, port_part, path)
    } else {
        if let Some(at_pos) = db_url.find('@') {
            let without_creds = &db_url[at_pos + 1..];
            return format!("(redacted){}", without_creds);
        }
        "(redacted)".to_string()
    }
}

/// Initialize SQLite database connection and run migrations.
///
/// Creates the parent directory for the database file (if applicable),
/// opens a connection pool using `create_if_missing(true)` and runs
/// migrations.
pub async fn init_db(config: &Config) -> Result<sqlx::SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Connecting to database: {}", redact_db_url(db_url));

    // Extract the file path from the database URL
    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Seed the stored feed URL from the environment when none is set yet.
/// A URL stored through the settings API always wins over the env value.
pub async fn seed_feed_url(pool: &sqlx::SqlitePool, config: &Config) -> Result<()> {
    let Some(ref env_url) = config.feed.url else {
        return Ok(());
    };

    let stored = FeedSettingsRepository::get(pool).await?;
    if stored.and_then(|s| s.feed_url).is_none() {
        tracing::info!("Seeding feed URL from environment");
        FeedSettingsRepository::set_url(pool, Some(env_url)).await?;
    }

    Ok(())
}

/// Spawn background workers:
/// - periodic feed synchronization
/// - reminder dispatch (polling for due reminders)
///
/// These are spawned as `tokio::spawn` tasks. The function returns a vector
/// of `JoinHandle<()>`s so callers can await task shutdown. Each worker
/// listens for a shutdown notification via a
/// `tokio::sync::broadcast::Sender<()>`.
pub fn spawn_background_workers(
    state: Arc<crate::AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    // Feed sync worker
    {
        let mut shutdown_rx = shutdown.subscribe();
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            loop {
                tracing::info!("Starting periodic feed synchronization");

                if let Err(e) = crate::services::sync::SyncManager::sync(&state).await {
                    tracing::warn!("Feed synchronization failed: {:?}", e);
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Feed sync worker shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(std::time::Duration::from_secs(
                        state.config.feed.sync_interval_seconds,
                    )) => {}
                }
            }
        }));
    }

    // Reminder dispatch worker
    {
        let mut shutdown_rx = shutdown.subscribe();
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            loop {
                // If reminders are disabled, sleep longer and check again.
                if !state.config.reminders.enabled {
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Reminder worker shutting down");
                            break;
                        }
                        _ = tokio::time::sleep(std::time::Duration::from_secs(60)) => {}
                    }
                    continue;
                }

                tracing::debug!("Polling for due reminders");

                let service = crate::services::reminders::ReminderService::new(&state);
                match service.process_due().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Dispatched {} due reminder(s)", n),
                    Err(e) => tracing::warn!("Reminder dispatch failed: {:?}", e),
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Reminder worker shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(std::time::Duration::from_secs(
                        state.config.reminders.poll_interval_seconds,
                    )) => {}
                }
            }
        }));
    }

    handles
}
