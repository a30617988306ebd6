use crate::adapters::full_website::FullWebsiteAggregator;
use crate::adapters::AdapterServices;
use crate::error::Result;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use async_trait::async_trait;

/// MacTechNews.de: same shape as the generic website adapter, pointed at
/// its specific article container and comment/share widget blocklist.
pub struct MacTechNewsAggregator {
    inner: FullWebsiteAggregator,
}

impl MacTechNewsAggregator {
    pub fn new(services: AdapterServices) -> Self {
        let inner = FullWebsiteAggregator::new(
            services,
            "#content .beitrag",
            vec!["script".into(), "style".into(), ".kommentare".into(), ".socialshare".into()],
        );
        MacTechNewsAggregator { inner }
    }
}

#[async_trait]
impl Aggregator for MacTechNewsAggregator {
    fn aggregator_type(&self) -> &'static str {
        "mactechnews"
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.inner.fetch_source_data(ctx).await
    }

    async fn parse_to_raw_articles(&self, ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        self.inner.parse_to_raw_articles(ctx, source_data, limit).await
    }
}
