use super::AdapterServices;
use crate::error::Result;
use crate::html::formatter::{format_article_content, FormatOptions};
use crate::html::toolkit::HtmlDoc;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use crate::rss::FeedParser;
use async_trait::async_trait;
use scraper::Selector;
use tokio::sync::Mutex;
use tracing::warn;

/// Base adapter for "RSS feed, but the feed only has a summary — go fetch
/// the real article page and extract its content" sources. Site adapters
/// specialize this by overriding the selectors and any of the extraction
/// hooks; most of them only need to change `content_selector` and
/// `selectors_to_remove`.
pub struct FullWebsiteAggregator {
    services: AdapterServices,
    parser: Mutex<FeedParser>,
    pub content_selector: String,
    pub selectors_to_remove: Vec<String>,
    pub empty_tags: Vec<String>,
}

impl FullWebsiteAggregator {
    pub fn new(services: AdapterServices, content_selector: impl Into<String>, selectors_to_remove: Vec<String>) -> Self {
        FullWebsiteAggregator {
            services,
            parser: Mutex::new(FeedParser::new()),
            content_selector: content_selector.into(),
            selectors_to_remove,
            empty_tags: vec!["p".into(), "div".into(), "span".into()],
        }
    }

    pub fn generic(services: AdapterServices) -> Self {
        Self::new(
            services,
            "article, main, .content, .post-content",
            vec!["script".into(), "style".into(), "nav".into(), "footer".into(), "aside".into()],
        )
    }

    /// Fetches the article page and returns the cleaned inner HTML of the
    /// first node matching `content_selector`, with `selectors_to_remove`
    /// pruned and empty wrapper tags collapsed. Site adapters override
    /// `process_content` rather than this if they need to inject extra
    /// passes (comments, proxied embeds, per-site blocklists).
    pub async fn fetch_article_content(&self, url: &str) -> Result<String> {
        self.services.http.get_text(url, None).await
    }

    pub fn extract_content(&self, html: &str) -> Result<String> {
        let doc = HtmlDoc::parse_document(html);
        let selector = Selector::parse(&self.content_selector).map_err(|_| {
            crate::error::AggregatorError::Other(format!("invalid content selector: {}", self.content_selector))
        })?;
        let content_html = doc
            .html
            .select(&selector)
            .next()
            .map(|el| el.inner_html())
            .unwrap_or_default();

        let mut fragment = HtmlDoc::parse_fragment(&content_html);
        let to_remove: Vec<&str> = self.selectors_to_remove.iter().map(|s| s.as_str()).collect();
        fragment.remove_selectors(&to_remove);
        let empty_tags: Vec<&str> = self.empty_tags.iter().map(|s| s.as_str()).collect();
        fragment.remove_empty_elements(&empty_tags);
        fragment.clean_data_attributes(&["data-src", "data-srcset"]);
        fragment.sanitize_class_names();
        fragment.clean_html();

        Ok(fragment.to_html())
    }

    pub async fn process_content(&self, cleaned: &str, article: &RawArticle) -> Result<String> {
        let header_image_url = article.icon.clone();
        Ok(format_article_content(
            cleaned,
            &FormatOptions {
                title: &article.name,
                url: &article.identifier,
                header_image_url: header_image_url.as_deref(),
                comments_html: None,
            },
        ))
    }
}

#[async_trait]
impl Aggregator for FullWebsiteAggregator {
    fn aggregator_type(&self) -> &'static str {
        "website"
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.services.http.get_text(&ctx.identifier, None).await
    }

    async fn parse_to_raw_articles(&self, _ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        let entries = {
            let mut parser = self.parser.lock().await;
            parser.parse(source_data)?.entries
        };

        let mut articles = Vec::new();
        for entry in entries.into_iter().take(limit) {
            let mut article = RawArticle::new(
                entry.url.clone(),
                entry.title,
                entry.published_at.unwrap_or_else(chrono::Utc::now),
            );

            match self.fetch_article_content(&article.identifier).await {
                Ok(html) => article.raw_content = Some(html),
                Err(e) if e.is_skippable() => {
                    warn!(url = %article.identifier, error = %e, "skipping article");
                    continue;
                }
                Err(e) => return Err(e),
            }

            if let Some(header) = self.services.headers.extract(&article.identifier).await? {
                article.icon = Some(header.html);
            }

            if let Some(raw) = &article.raw_content {
                let cleaned = self.extract_content(raw)?;
                article.content = Some(self.process_content(&cleaned, &article).await?);
            }

            articles.push(article);
        }

        Ok(articles)
    }
}
