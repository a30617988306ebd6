use crate::adapters::full_website::FullWebsiteAggregator;
use crate::adapters::AdapterServices;
use crate::error::Result;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use async_trait::async_trait;

/// Caschys Blog (stadt-bremerhaven.de) is a straightforward WordPress tech
/// blog; the generic extractor works once pointed at the right content
/// selector and ad-slot blocklist.
pub struct CaschysBlogAggregator {
    inner: FullWebsiteAggregator,
}

impl CaschysBlogAggregator {
    pub fn new(services: AdapterServices) -> Self {
        let inner = FullWebsiteAggregator::new(
            services,
            ".entry-content",
            vec!["script".into(), "style".into(), ".sharedaddy".into(), ".jp-relatedposts".into(), "ins.adsbygoogle".into()],
        );
        CaschysBlogAggregator { inner }
    }
}

#[async_trait]
impl Aggregator for CaschysBlogAggregator {
    fn aggregator_type(&self) -> &'static str {
        "caschys_blog"
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.inner.fetch_source_data(ctx).await
    }

    async fn parse_to_raw_articles(&self, ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        self.inner.parse_to_raw_articles(ctx, source_data, limit).await
    }
}
