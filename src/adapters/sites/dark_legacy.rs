use crate::adapters::AdapterServices;
use crate::error::Result;
use crate::html::toolkit::HtmlDoc;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use crate::rss::FeedParser;
use async_trait::async_trait;
use scraper::Selector;

/// Webcomic aggregators (Dark Legacy, Explosm, Oglaf) share a shape: the
/// feed entry *is* the comic, the comic is a single image, and the "body"
/// is just that image fetched, compressed, and embedded — there's no
/// prose to extract.
pub struct DarkLegacyAggregator {
    services: AdapterServices,
}

impl DarkLegacyAggregator {
    pub fn new(services: AdapterServices) -> Self {
        DarkLegacyAggregator { services }
    }
}

pub async fn build_comic_article(
    services: &AdapterServices,
    url: &str,
    title: &str,
    published_at: chrono::DateTime<chrono::Utc>,
    description_html: &str,
) -> Option<RawArticle> {
    let doc = HtmlDoc::parse_fragment(description_html);
    let selector = Selector::parse("img").ok()?;
    let image_url = doc.html.select(&selector).next()?.value().attr("src")?.to_string();

    let mut article = RawArticle::new(url.to_string(), title.to_string(), published_at);

    match services.images.fetch_and_compress(&image_url, true).await {
        Ok(compressed) => {
            article.content = Some(format!(
                "<p><img src=\"{}\" alt=\"{}\" style=\"max-width:100%;height:auto;\"></p>",
                compressed.data_uri, title
            ));
            article.icon = Some(article.content.clone().unwrap());
        }
        Err(e) if e.is_skippable() => return None,
        Err(_) => {
            article.content = Some(format!("<p><img src=\"{image_url}\" alt=\"{title}\"></p>"));
        }
    }

    Some(article)
}

#[async_trait]
impl Aggregator for DarkLegacyAggregator {
    fn aggregator_type(&self) -> &'static str {
        "dark_legacy"
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
