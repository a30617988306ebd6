//! Persistence, built the way the teacher's `RssState` builds it: runtime
//! `sqlx::query(...)` with explicit `.bind()`/`.try_get()` rather than the
//! compile-time-checked `query!` macros, since those require a live
//! database or an offline query cache to validate against at build time.

use super::models::{Article, ArticleState, Feed, FeedGroup, GReaderAuthToken, User, UserSettings};
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().max_connections(8).connect_with(options).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(SqliteStore { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // --- Feeds -----------------------------------------------------

    pub async fn get_feed(&self, feed_id: i64) -> Result<Option<Feed>> {
        let row = sqlx::query("SELECT * FROM feeds WHERE id = ?1").bind(feed_id).fetch_optional(&self.pool).await?;
        Ok(row.map(row_to_feed))
    }

    pub async fn list_enabled_feeds(&self) -> Result<Vec<Feed>> {
        let rows = sqlx::query("SELECT * FROM feeds WHERE enabled = 1").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_feed).collect())
    }

    pub async fn list_feeds_for_user(&self, user_id: i64) -> Result<Vec<Feed>> {
        let rows = sqlx::query("SELECT * FROM feeds WHERE owner_id = ?1 OR owner_id IS NULL")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_feed).collect())
    }

    pub async fn set_feed_enabled(&self, feed_id: i64, enabled: bool) -> Result<()> {
        sqlx::query("UPDATE feeds SET enabled = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(enabled)
            .bind(Utc::now().to_rfc3339())
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn collected_today_count(&self, feed_id: i64) -> Result<i64> {
        let midnight = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let row = sqlx::query("SELECT COUNT(*) as n FROM articles WHERE feed_id = ?1 AND created_at >= ?2")
            .bind(feed_id)
            .bind(midnight.to_rfc3339())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    // --- Feed groups -------------------------------------------------

    pub async fn get_feed_group_by_name(&self, owner_id: i64, name: &str) -> Result<Option<FeedGroup>> {
        let row = sqlx::query("SELECT * FROM feed_groups WHERE owner_id = ?1 AND name = ?2")
            .bind(owner_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| FeedGroup {
            id: r.get("id"),
            owner_id: r.get("owner_id"),
            name: r.get("name"),
        }))
    }

    pub async fn list_groups_for_user(&self, owner_id: i64) -> Result<Vec<FeedGroup>> {
        let rows = sqlx::query("SELECT * FROM feed_groups WHERE owner_id = ?1").bind(owner_id).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| FeedGroup { id: r.get("id"), owner_id: r.get("owner_id"), name: r.get("name") })
            .collect())
    }

    pub async fn feed_ids_in_group(&self, group_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM feeds WHERE group_id = ?1 AND enabled = 1")
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get("id")).collect())
    }

    /// Feeds visible to `user_id`: owned by them, or shared (no owner).
    /// Applies the access-control clause every stream filter needs.
    pub async fn accessible_feed_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM feeds WHERE enabled = 1 AND (owner_id = ?1 OR owner_id IS NULL)")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get("id")).collect())
    }

    pub async fn feed_ids_by_aggregator_tag(&self, user_id: i64, tag: &str) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM feeds WHERE aggregator_tag = ?1 AND enabled = 1 AND (owner_id = ?2 OR owner_id IS NULL)")
            .bind(tag)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get("id")).collect())
    }

    // --- Articles ------------------------------------------------------

    /// Inserts a new article, doing nothing if `(feed_id, identifier)`
    /// already exists. Returns `true` if a row was actually inserted.
    pub async fn upsert_article(&self, feed_id: i64, a: &crate::pipeline::types::RawArticle) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO articles (feed_id, identifier, name, raw_content, content, date, published_at, author, icon, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT(feed_id, identifier) DO NOTHING",
        )
        .bind(feed_id)
        .bind(&a.identifier)
        .bind(&a.name)
        .bind(&a.raw_content)
        .bind(&a.content)
        .bind(a.date.to_rfc3339())
        .bind(a.date.to_rfc3339())
        .bind(&a.author)
        .bind(&a.icon)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_article(&self, article_id: i64) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?1").bind(article_id).fetch_optional(&self.pool).await?;
        Ok(row.map(row_to_article))
    }

    /// Fetches up to `limit` articles matching `feed_ids` (or any feed, if
    /// `feed_ids` is `None`), ordered newest-first by default (`oldest_first`
    /// reverses that), starting after `after_id` (the GReader `continuation`
    /// cursor).
    #[allow(clippy::too_many_arguments)]
    pub async fn list_articles(
        &self,
        user_id: i64,
        feed_ids: Option<&[i64]>,
        only_unread: bool,
        only_read: bool,
        only_starred: bool,
        oldest_first: bool,
        after_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Article>> {
        let needs_state = only_unread || only_read || only_starred;
        let mut sql = String::from("SELECT a.* FROM articles a");
        if needs_state {
            sql.push_str(" LEFT JOIN article_state s ON s.article_id = a.id AND s.user_id = ?1");
        }
        sql.push_str(" WHERE 1=1");
        if let Some(ids) = feed_ids {
            let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("?{}", i + 10)).collect();
            sql.push_str(&format!(" AND a.feed_id IN ({})", placeholders.join(",")));
        }
        if only_unread {
            sql.push_str(" AND COALESCE(s.read, 0) = 0");
        }
        if only_read {
            sql.push_str(" AND COALESCE(s.read, 0) = 1");
        }
        if only_starred {
            sql.push_str(" AND COALESCE(s.starred, 0) = 1");
        }
        if after_id.is_some() {
            sql.push_str(if oldest_first { " AND a.id > ?2" } else { " AND a.id < ?2" });
        }
        sql.push_str(if oldest_first { " ORDER BY a.id ASC LIMIT ?3" } else { " ORDER BY a.id DESC LIMIT ?3" });

        let mut query = sqlx::query(&sql);
        if needs_state {
            query = query.bind(user_id);
        }
        query = query.bind(after_id.unwrap_or(if oldest_first { i64::MIN } else { i64::MAX }));
        query = query.bind(limit);
        if let Some(ids) = feed_ids {
            for id in ids {
                query = query.bind(*id);
            }
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_article).collect())
    }

    pub async fn get_article_state(&self, user_id: i64, article_id: i64) -> Result<ArticleState> {
        let row = sqlx::query("SELECT read, starred FROM article_state WHERE user_id = ?1 AND article_id = ?2")
            .bind(user_id)
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| ArticleState { read: r.get("read"), starred: r.get("starred") }).unwrap_or_default())
    }

    pub async fn set_article_state(&self, user_id: i64, article_id: i64, read: Option<bool>, starred: Option<bool>) -> Result<()> {
        let current = self.get_article_state(user_id, article_id).await?;
        let read = read.unwrap_or(current.read);
        let starred = starred.unwrap_or(current.starred);
        sqlx::query(
            "INSERT INTO article_state (user_id, article_id, read, starred) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, article_id) DO UPDATE SET read = excluded.read, starred = excluded.starred",
        )
        .bind(user_id)
        .bind(article_id)
        .bind(read)
        .bind(starred)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64, feed_ids: &[i64], older_than: DateTime<Utc>) -> Result<()> {
        let placeholders: Vec<String> = (0..feed_ids.len()).map(|i| format!("?{}", i + 3)).collect();
        let sql = format!(
            "INSERT INTO article_state (user_id, article_id, read, starred)
             SELECT ?1, a.id, 1, COALESCE((SELECT starred FROM article_state WHERE user_id = ?1 AND article_id = a.id), 0)
             FROM articles a WHERE a.feed_id IN ({}) AND a.date <= ?2
             ON CONFLICT(user_id, article_id) DO UPDATE SET read = 1",
            placeholders.join(",")
        );
        let mut query = sqlx::query(&sql).bind(user_id).bind(older_than.to_rfc3339());
        for id in feed_ids {
            query = query.bind(*id);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    pub async fn unread_count(&self, feed_id: i64, user_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as n FROM articles a
             LEFT JOIN article_state s ON s.article_id = a.id AND s.user_id = ?1
             WHERE a.feed_id = ?2 AND COALESCE(s.read, 0) = 0",
        )
        .bind(user_id)
        .bind(feed_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    // --- Users / auth ----------------------------------------------------

    pub async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1 OR email = ?1")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_user))
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1").bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row.map(row_to_user))
    }

    pub async fn get_user_settings(&self, user_id: i64) -> Result<UserSettings> {
        let row = sqlx::query("SELECT * FROM user_settings WHERE user_id = ?1").bind(user_id).fetch_optional(&self.pool).await?;
        Ok(row
            .map(|r| UserSettings {
                user_id: r.get("user_id"),
                reddit_client_id: r.get("reddit_client_id"),
                reddit_client_secret: r.get("reddit_client_secret"),
                reddit_user_agent: r.get("reddit_user_agent"),
                reddit_enabled: r.get("reddit_enabled"),
                youtube_api_key: r.get("youtube_api_key"),
                youtube_enabled: r.get("youtube_enabled"),
                ai_provider: r.get("ai_provider"),
                ai_api_key: r.get("ai_api_key"),
                ai_model: r.get("ai_model"),
                ai_temperature: r.get("ai_temperature"),
                ai_max_tokens: r.get("ai_max_tokens"),
                ai_max_retries: r.get("ai_max_retries"),
                ai_retry_base_delay_ms: r.get("ai_retry_base_delay_ms"),
            })
            .unwrap_or(UserSettings { user_id, ai_max_retries: 3, ai_retry_base_delay_ms: 500, ..Default::default() }))
    }

    pub async fn insert_auth_token(&self, token: &GReaderAuthToken) -> Result<()> {
        sqlx::query("INSERT INTO greader_auth_tokens (token, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&token.token)
            .bind(token.user_id)
            .bind(token.expires_at.map(|d| d.to_rfc3339()))
            .bind(token.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_auth_token(&self, token: &str) -> Result<Option<GReaderAuthToken>> {
        let row = sqlx::query("SELECT * FROM greader_auth_tokens WHERE token = ?1").bind(token).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| GReaderAuthToken {
            token: r.get("token"),
            user_id: r.get("user_id"),
            expires_at: r.get::<Option<String>, _>("expires_at").and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
            created_at: DateTime::parse_from_rfc3339(&r.get::<String, _>("created_at")).unwrap().with_timezone(&Utc),
        }))
    }

    pub async fn revoke_auth_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM greader_auth_tokens WHERE token = ?1").bind(token).execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_feed(r: sqlx::sqlite::SqliteRow) -> Feed {
    let options_text: String = r.get("options");
    Feed {
        id: r.get("id"),
        owner_id: r.get("owner_id"),
        group_id: r.get("group_id"),
        identifier: r.get("identifier"),
        aggregator_tag: r.get("aggregator_tag"),
        name: r.get("name"),
        icon: r.get("icon"),
        icon_content_type: r.get("icon_content_type"),
        daily_limit: r.get("daily_limit"),
        enabled: r.get("enabled"),
        options: serde_json::from_str(&options_text).unwrap_or(serde_json::json!({})),
        created_at: parse_dt(&r.get::<String, _>("created_at")),
        updated_at: parse_dt(&r.get::<String, _>("updated_at")),
    }
}

fn row_to_article(r: sqlx::sqlite::SqliteRow) -> Article {
    Article {
        id: r.get("id"),
        feed_id: r.get("feed_id"),
        identifier: r.get("identifier"),
        name: r.get("name"),
        raw_content: r.get("raw_content"),
        content: r.get("content"),
        date: parse_dt(&r.get::<String, _>("date")),
        published_at: parse_dt(&r.get::<String, _>("published_at")),
        author: r.get("author"),
        icon: r.get("icon"),
        created_at: parse_dt(&r.get::<String, _>("created_at")),
        updated_at: parse_dt(&r.get::<String, _>("updated_at")),
    }
}

fn row_to_user(r: sqlx::sqlite::SqliteRow) -> User {
    User {
        id: r.get("id"),
        username: r.get("username"),
        email: r.get("email"),
        password_hash: r.get("password_hash"),
        created_at: parse_dt(&r.get::<String, _>("created_at")),
    }
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}
