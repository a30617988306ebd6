use crate::adapters::full_website::FullWebsiteAggregator;
use crate::adapters::AdapterServices;
use crate::error::Result;
use crate::html::toolkit::HtmlDoc;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use async_trait::async_trait;

/// Merkur.de runs its feed content through the generic sanitizer but,
/// unlike most sites, also needs the `data-sanitized-*` renaming pass torn
/// back out afterward — the renamed attributes are only useful mid-pass to
/// this adapter for locating teaser widgets, not in the stored article.
pub struct MerkurAggregator {
    inner: FullWebsiteAggregator,
}

impl MerkurAggregator {
    pub fn new(services: AdapterServices) -> Self {
        let inner = FullWebsiteAggregator::new(
            services,
            "#ps-article, .id-StoryElementText",
            vec!["script".into(), "style".into(), ".id-Comments".into(), ".id-SocialMediaBox".into(), ".id-Ad".into()],
        );
        MerkurAggregator { inner }
    }
}

#[async_trait]
impl Aggregator for MerkurAggregator {
    fn aggregator_type(&self) -> &'static str {
        "merkur"
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.inner.fetch_source_data(ctx).await
    }

    async fn parse_to_raw_articles(&self, ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        let mut articles = self.inner.parse_to_raw_articles(ctx, source_data, limit).await?;
        for article in &mut articles {
            if let Some(content) = &article.content {
                let mut doc = HtmlDoc::parse_fragment(content);
                doc.sanitize_html_attributes();
                doc.remove_sanitized_attributes();
                article.content = Some(doc.to_html());
            }
        }
        Ok(articles)
    }
}
