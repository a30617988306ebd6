use std::time::Duration;

/// Process configuration, loaded once at startup from the environment
/// (optionally backed by a `.env` file via `dotenvy`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub bind_addr: String,
    pub user_agent: String,
    pub http_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub unread_count_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./greaderd.sqlite3".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            user_agent: std::env::var("AGGREGATOR_USER_AGENT")
                .unwrap_or_else(|_| "greaderd/0.1 (+https://example.invalid)".to_string()),
            http_timeout: Duration::from_secs(
                std::env::var("HTTP_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            ),
            max_retries: std::env::var("HTTP_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            retry_base_delay: Duration::from_millis(
                std::env::var("HTTP_RETRY_BASE_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(500),
            ),
            unread_count_cache_ttl: Duration::from_secs(30),
        }
    }
}

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}
