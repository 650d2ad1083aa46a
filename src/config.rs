use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub reminders: ReminderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Optional seed URL applied at startup when no feed URL is stored yet.
    /// The stored value remains editable through the settings API.
    pub url: Option<String>,
    /// Timeout for a single feed fetch.
    pub fetch_timeout_seconds: u64,
    /// How often the background worker re-synchronizes the feed.
    pub sync_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderConfig {
    /// Whether the reminder dispatch worker runs at all.
    pub enabled: bool,
    /// Optional webhook that due reminders are POSTed to. When unset,
    /// reminders are written to the log instead.
    pub webhook_url: Option<String>,
    /// How often (seconds) the worker polls for due reminders.
    pub poll_interval_seconds: u64,
    /// Initial backoff in seconds for the first delivery retry.
    pub initial_backoff_seconds: u64,
    /// Cap for exponential backoff (seconds).
    pub max_backoff_seconds: u64,
    /// Maximum delivery attempts before a reminder is marked dead.
    pub max_attempts: u32,
    /// Maximum reminders claimed per poll cycle.
    pub batch_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/app.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            feed: FeedConfig {
                url: env::var("FEED_URL").ok(),
                fetch_timeout_seconds: env::var("FEED_FETCH_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30u64),
                sync_interval_seconds: env::var("FEED_SYNC_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600u64),
            },
            reminders: ReminderConfig {
                enabled: match env::var("REMINDERS_ENABLED") {
                    Ok(v) => match v.to_lowercase().as_str() {
                        "1" | "true" | "yes" => true,
                        "0" | "false" | "no" => false,
                        _ => true,
                    },
                    Err(_) => true,
                },
                webhook_url: env::var("REMINDER_WEBHOOK_URL").ok(),
                poll_interval_seconds: env::var("REMINDER_POLL_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30u64),
                initial_backoff_seconds: env::var("REMINDER_INITIAL_BACKOFF_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30u64),
                max_backoff_seconds: env::var("REMINDER_MAX_BACKOFF_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600u64),
                max_attempts: env::var("REMINDER_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5u32),
                batch_size: env::var("REMINDER_BATCH_SIZE")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10u32),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/app.db".to_string(),
                max_connections: 5,
            },
            feed: FeedConfig {
                url: None,
                fetch_timeout_seconds: 30,
                sync_interval_seconds: 3600,
            },
            reminders: ReminderConfig {
                enabled: true,
                webhook_url: None,
                poll_interval_seconds: 30,
                initial_backoff_seconds: 30,
                max_backoff_seconds: 3600,
                max_attempts: 5,
                batch_size: 10,
            },
        }
    }
}
