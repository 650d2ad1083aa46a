use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use http::HeaderValue;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod ics;
mod routes;
mod services;

use config::Config;
use services::{
    feed::FeedService,
    init,
    reminders::{LogSink, ReminderSink, WebhookSink},
};

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub feed: FeedService,
    /// Reminder delivery target, chosen once at startup.
    pub reminder_sink: Arc<dyn ReminderSink>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assignment_notifications=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Assignment Notifications Service");

    // Initialize database
    let pool = init::init_db(&config).await?;
    init::seed_feed_url(&pool, &config).await?;

    // Initialize services
    let feed = FeedService::new(&config)?;

    let reminder_sink: Arc<dyn ReminderSink> = match config.reminders.webhook_url.clone() {
        Some(url) => {
            tracing::info!("Delivering reminders to the configured webhook");
            Arc::new(WebhookSink::new(url)?)
        }
        None => {
            tracing::info!("No reminder webhook configured; due reminders will be logged");
            Arc::new(LogSink)
        }
    };

    let app_state = Arc::new(AppState {
        db: pool,
        config: config.clone(),
        feed,
        reminder_sink,
    });

    // Create shutdown notifier for background workers
    let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    // Spawn background workers (returns JoinHandles so we can await shutdown)
    let bg_handles = init::spawn_background_workers(app_state.clone(), shutdown_tx.clone());

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        // Assignment listing, completion toggling, manual sync
        .nest("/api/assignments", routes::assignments::router())
        // Scheduled reminders and delivery log
        .nest("/api/reminders", routes::reminders::router())
        // Subject codes and aliases
        .nest("/api/subjects", routes::subjects::router())
        // Feed URL settings
        .nest("/api/settings", routes::settings::router())
        // Add shared state
        .with_state(app_state.clone())
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(
                    config
                        .server
                        .frontend_url
                        .parse::<HeaderValue>()
                        .expect("Invalid FRONTEND_URL for CORS"),
                )
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::PUT,
                    http::Method::DELETE,
                    http::Method::OPTIONS,
                ])
                .allow_headers([http::header::CONTENT_TYPE, http::header::ACCEPT]),
        );

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    // Serve and race against a shutdown-signal listener. When a signal
    // arrives we notify background workers and drop the server future,
    // which stops accepting new connections.
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(listener, app);

    let shutdown_tx_clone = shutdown_tx.clone();
    let signal_fut = async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut term =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to bind SIGTERM");
            tokio::select! {
                _ = ctrl_c => {},
                _ = term.recv() => {},
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("Failed to bind Ctrl+C");
        }

        tracing::info!("Shutdown signal received, notifying background workers");
        let _ = shutdown_tx_clone.send(());
    };

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Signal handler completed; server future dropped to stop accepting new connections");
        }
    }

    // Give background workers some time to finish their work.
    let shutdown_wait = Duration::from_secs(15);
    tracing::info!(
        "Waiting up to {}s for background workers to exit",
        shutdown_wait.as_secs()
    );

    let bg_wait = async {
        for h in bg_handles {
            let _ = h.await;
        }
    };
    let _ = tokio::time::timeout(shutdown_wait, bg_wait).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
