//! Scheduler surface (C14). The actual scheduling decision — when to run a
//! feed, when to purge old articles — lives outside this crate; this is
//! the trait boundary an external trigger calls into, exercised here by
//! the CLI's `run-feed`/`run-due`/`purge-old` subcommands.

use crate::adapters::AggregatorRegistry;
use crate::error::{AggregatorError, Result};
use crate::persistence::SqliteStore;
use crate::pipeline::types::FeedContext;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, info_span, warn, Instrument};

/// What an external scheduler can ask this crate to do.
#[async_trait]
pub trait SchedulerTrigger: Send + Sync {
    /// Run one feed now, ignoring its normal cadence.
    async fn run_feed(&self, feed_id: i64) -> Result<()>;

    /// Run every enabled feed whose turn it is (in this implementation:
    /// every enabled feed, since per-feed cadence bookkeeping is left to
    /// the external scheduler).
    async fn run_due(&self) -> Result<()>;

    /// Deletes articles older than `max_age_days`.
    async fn purge_old(&self, max_age_days: i64) -> Result<u64>;
}

pub struct DefaultScheduler {
    store: SqliteStore,
    registry: AggregatorRegistry,
}

impl DefaultScheduler {
    pub fn new(store: SqliteStore, registry: AggregatorRegistry) -> Self {
        DefaultScheduler { store, registry }
    }

    async fn run_one(&self, feed_id: i64) -> Result<()> {
        let span = info_span!("aggregation_run", feed_id);
        async move {
            let feed = self
                .store
                .get_feed(feed_id)
                .await?
                .ok_or_else(|| AggregatorError::InvalidIdentifier { reason: format!("no such feed: {feed_id}") })?;

            let aggregator = self.registry.get(&feed.aggregator_tag)?;
            let collected_today = self.store.collected_today_count(feed_id).await?;
            let options = feed
                .options
                .as_object()
                .map(|m| m.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect())
                .unwrap_or_default();

            let ctx = FeedContext {
                feed_id,
                identifier: feed.identifier.clone(),
                name: feed.name.clone(),
                daily_limit: feed.daily_limit,
                collected_today,
                options,
            };

            let (articles, outcome) = aggregator.run(&ctx).await?;
            let mut inserted = 0;
            for article in &articles {
                if self.store.upsert_article(feed_id, article).await? {
                    inserted += 1;
                }
            }

            info!(feed_id, collected = outcome.collected, skipped = outcome.skipped, inserted, "run complete");
            Ok(())
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl SchedulerTrigger for DefaultScheduler {
    async fn run_feed(&self, feed_id: i64) -> Result<()> {
        self.run_one(feed_id).await
    }

    async fn run_due(&self) -> Result<()> {
        let feeds = self.store.list_enabled_feeds().await?;
        for feed in feeds {
            if let Err(e) = self.run_one(feed.id).await {
                warn!(feed_id = feed.id, error = %e, "feed run failed, continuing with the rest");
            }
        }
        Ok(())
    }

    async fn purge_old(&self, max_age_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(max_age_days);
        let result = sqlx::query("DELETE FROM articles WHERE date < ?1").bind(cutoff.to_rfc3339()).execute(self.store.pool()).await?;
        Ok(result.rows_affected())
    }
}
