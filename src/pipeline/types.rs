use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// An article as produced by `parse_to_raw_articles`, before filtering,
/// enrichment, or finalization have touched it.
#[derive(Debug, Clone)]
pub struct RawArticle {
    pub identifier: String,
    pub name: String,
    pub raw_content: Option<String>,
    pub content: Option<String>,
    pub date: DateTime<Utc>,
    pub author: Option<String>,
    pub icon: Option<String>,
    pub extra: HashMap<String, String>,
}

impl RawArticle {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>, date: DateTime<Utc>) -> Self {
        RawArticle {
            identifier: identifier.into(),
            name: name.into(),
            raw_content: None,
            content: None,
            date,
            author: None,
            icon: None,
            extra: HashMap::new(),
        }
    }
}

/// Everything a run needs to know about the feed it is operating on,
/// independent of how that feed is persisted.
#[derive(Debug, Clone)]
pub struct FeedContext {
    pub feed_id: i64,
    pub identifier: String,
    pub name: String,
    pub daily_limit: i64,
    pub collected_today: i64,
    pub options: HashMap<String, String>,
}

/// Outcome of a single aggregation run, handed back to the caller
/// (CLI subcommand or scheduler trigger) for logging/persistence.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub collected: usize,
    pub skipped: usize,
}
