pub mod run_limiter;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use tracing::{info, warn};
use types::{FeedContext, RawArticle, RunOutcome};

const MAX_ARTICLE_AGE_DAYS: i64 = 60;
const DATE_JITTER_SECONDS: i64 = 30;

/// Template method shared by every source-specific aggregator. A concrete
/// adapter only needs to implement `fetch_source_data` and
/// `parse_to_raw_articles`; everything else has a sensible default that
/// can be overridden for site-specific behavior (comment fetching, title
/// blocklists, multi-page assembly, and so on).
#[async_trait]
pub trait Aggregator: Send + Sync {
    fn aggregator_type(&self) -> &'static str;

    /// Checked once before a run starts; the default accepts any
    /// non-empty identifier.
    fn validate(&self, ctx: &FeedContext) -> Result<()> {
        if ctx.identifier.trim().is_empty() {
            return Err(crate::error::AggregatorError::InvalidIdentifier {
                reason: "identifier is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Fetches whatever source payload `parse_to_raw_articles` expects —
    /// feed XML, a JSON API response, a scraped HTML page.
    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String>;

    /// Turns the fetched payload into up to `limit` candidate articles, in
    /// source order (newest or most relevant first).
    async fn parse_to_raw_articles(
        &self,
        ctx: &FeedContext,
        source_data: &str,
        limit: usize,
    ) -> Result<Vec<RawArticle>>;

    /// Drops stale items and assigns each survivor a fresh, slightly
    /// jittered timestamp so the GReader stream sorts newly collected
    /// items close together without ties.
    fn filter_articles(&self, _ctx: &FeedContext, articles: Vec<RawArticle>) -> Vec<RawArticle> {
        default_filter_articles(articles)
    }

    /// Adds derived content: header elements, rendered markdown,
    /// extracted article bodies. The default is a no-op passthrough.
    async fn enrich_articles(&self, _ctx: &FeedContext, articles: Vec<RawArticle>) -> Result<Vec<RawArticle>> {
        Ok(articles)
    }

    /// The last stage before persistence. This system ships a no-op
    /// finalizer; a deployment that wants an AI rewrite pass plugs in here
    /// instead of re-implementing the rest of the pipeline.
    async fn finalize_articles(&self, _ctx: &FeedContext, articles: Vec<RawArticle>) -> Result<Vec<RawArticle>> {
        Ok(articles)
    }

    /// The canonical homepage/source URL for this feed, used as a
    /// GReader subscription fallback when no per-article link applies.
    fn get_source_url(&self, ctx: &FeedContext) -> String {
        ctx.identifier.clone()
    }

    /// Runs the full `validate -> (quota check) -> fetch -> parse ->
    /// filter -> enrich -> finalize` pipeline for one feed invocation.
    async fn run(&self, ctx: &FeedContext) -> Result<(Vec<RawArticle>, RunOutcome)> {
        self.validate(ctx)?;

        let limit = run_limiter::current_run_limit(Utc::now(), ctx.daily_limit, ctx.collected_today);
        if limit == 0 {
            info!(feed_id = ctx.feed_id, "run limit is zero, skipping this invocation");
            return Ok((Vec::new(), RunOutcome::default()));
        }

        let source_data = self.fetch_source_data(ctx).await?;
        let raw = self.parse_to_raw_articles(ctx, &source_data, limit as usize).await?;
        let collected_raw = raw.len();

        let filtered = self.filter_articles(ctx, raw);
        let skipped = collected_raw - filtered.len();

        let enriched = self.enrich_articles(ctx, filtered).await?;
        let finalized = self.finalize_articles(ctx, enriched).await?;

        if skipped > 0 {
            warn!(feed_id = ctx.feed_id, skipped, "articles dropped by filter stage");
        }

        let outcome = RunOutcome { collected: finalized.len(), skipped };
        Ok((finalized, outcome))
    }
}

/// Default `filter_articles`: drops anything older than
/// `MAX_ARTICLE_AGE_DAYS`, and re-stamps accepted articles with
/// `now + jitter` so a burst of simultaneously-published items doesn't
/// collide on the same sort key.
pub fn default_filter_articles(articles: Vec<RawArticle>) -> Vec<RawArticle> {
    let now = Utc::now();
    let cutoff = now - ChronoDuration::days(MAX_ARTICLE_AGE_DAYS);
    let mut rng = rand::thread_rng();

    articles
        .into_iter()
        .filter(|a| a.date >= cutoff)
        .map(|mut a| {
            let jitter = rng.gen_range(-DATE_JITTER_SECONDS..=DATE_JITTER_SECONDS);
            a.date = now + ChronoDuration::seconds(jitter);
            a
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_articles_older_than_cutoff() {
        let old = RawArticle::new("id1", "old", Utc::now() - ChronoDuration::days(61));
        let fresh = RawArticle::new("id2", "fresh", Utc::now() - ChronoDuration::days(1));
        let result = default_filter_articles(vec![old, fresh]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].identifier, "id2");
    }
}
