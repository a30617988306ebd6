use crate::error::Result;
use crate::http_client::HttpClient;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use crate::rss::FeedParser;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Plain RSS/Atom feed adapter: fetch the feed XML, parse entries, done.
/// No content extraction beyond what the feed itself supplies — this is
/// the adapter used for feeds that already publish full article bodies.
pub struct RssAggregator {
    http: HttpClient,
    parser: Mutex<FeedParser>,
}

impl RssAggregator {
    pub fn new(http: HttpClient) -> Self {
        RssAggregator { http, parser: Mutex::new(FeedParser::new()) }
    }
}

#[async_trait]
impl Aggregator for RssAggregator {
    fn aggregator_type(&self) -> &'static str {
        "rss"
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.http.get_text(&ctx.identifier, None).await
    }

    async fn parse_to_raw_articles(&self, _ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        let mut parser = self.parser.lock().await;
        let feed = parser.parse(source_data)?;

        Ok(feed
            .entries
            .into_iter()
            .take(limit)
            .map(|entry| {
                let mut article = RawArticle::new(
                    entry.url.clone(),
                    entry.title,
                    entry.published_at.unwrap_or_else(chrono::Utc::now),
                );
                article.content = entry.content.or(entry.summary);
                article.author = entry.author;
                article.icon = entry.image_url;
                article
            })
            .collect())
    }
}
