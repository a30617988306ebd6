use super::dark_legacy::build_comic_article;
use crate::adapters::AdapterServices;
use crate::error::Result;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use crate::rss::FeedParser;
use async_trait::async_trait;

/// Cyanide & Happiness — same single-image-per-entry shape as
/// [`super::dark_legacy::DarkLegacyAggregator`].
pub struct ExplosmAggregator {
    services: AdapterServices,
}

impl ExplosmAggregator {
    pub fn new(services: AdapterServices) -> Self {
        ExplosmAggregator { services }
    }
}

#[async_trait]
impl Aggregator for ExplosmAggregator {
    fn aggregator_type(&self) -> &'static str {
        "explosm"
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.services.http.get_text(&ctx.identifier, None).await
    }

    async fn parse_to_raw_articles(&self, _ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        let mut parser = FeedParser::new();
        let entries = parser.parse(source_data)?.entries;

        let mut articles = Vec::new();
        for entry in entries.into_iter().take(limit) {
            let description = entry.summary.clone().or_else(|| entry.content.clone()).unwrap_or_default();
            let published = entry.published_at.unwrap_or_else(chrono::Utc::now);
            if let Some(article) = build_comic_article(&self.services, &entry.url, &entry.title, published, &description).await {
                articles.push(article);
            }
        }
        Ok(articles)
    }
}
