use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UserSettings {
    pub user_id: i64,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: Option<String>,
    pub reddit_enabled: bool,
    pub youtube_api_key: Option<String>,
    pub youtube_enabled: bool,
    pub ai_provider: Option<String>,
    pub ai_api_key: Option<String>,
    pub ai_model: Option<String>,
    pub ai_temperature: Option<f64>,
    pub ai_max_tokens: Option<i64>,
    pub ai_max_retries: i64,
    pub ai_retry_base_delay_ms: i64,
}

#[derive(Debug, Clone)]
pub struct Feed {
    pub id: i64,
    pub owner_id: Option<i64>,
    pub group_id: Option<i64>,
    pub identifier: String,
    pub aggregator_tag: String,
    pub name: String,
    pub icon: Option<Vec<u8>>,
    pub icon_content_type: Option<String>,
    pub daily_limit: i64,
    pub enabled: bool,
    pub options: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FeedGroup {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub identifier: String,
    pub name: String,
    pub raw_content: Option<String>,
    pub content: Option<String>,
    pub date: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
    pub author: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleState {
    pub read: bool,
    pub starred: bool,
}

#[derive(Debug, Clone)]
pub struct GReaderAuthToken {
    pub token: String,
    pub user_id: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
