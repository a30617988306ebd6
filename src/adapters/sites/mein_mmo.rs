use crate::adapters::full_website::FullWebsiteAggregator;
use crate::adapters::AdapterServices;
use crate::error::Result;
use crate::html::toolkit::HtmlDoc;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use tracing::warn;

static PAGE_NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)/?$").unwrap());

/// mein-mmo.de splits long guides across multiple numbered pages. This
/// detects every page number linked from the pagination widget, fetches
/// each one, and concatenates their `div.gp-entry-content` blocks into a
/// single article body before the generic extractor ever sees it.
pub struct MeinMmoAggregator {
    inner: FullWebsiteAggregator,
}

impl MeinMmoAggregator {
    pub fn new(services: AdapterServices) -> Self {
        let inner = FullWebsiteAggregator::new(
            services,
            "div.gp-entry-content",
            vec!["script".into(), "style".into(), ".gp-ad".into()],
        );
        MeinMmoAggregator { inner }
    }

    fn detect_page_numbers(html: &str) -> Vec<u32> {
        let doc = HtmlDoc::parse_document(html);
        let container_selectors = ["nav.navigation.pagination", "div.gp-pagination", "ul.page-numbers"];
        let mut found = None;
        for sel in container_selectors {
            if let Ok(selector) = Selector::parse(sel) {
                if doc.html.select(&selector).next().is_some() {
                    found = Some(sel);
                    break;
                }
            }
        }
        if found.is_none() {
            return vec![1];
        }

        let mut pages = std::collections::BTreeSet::new();
        pages.insert(1);

        if let Ok(selector) = Selector::parse("a.page-numbers, a.post-page-numbers") {
            for el in doc.html.select(&selector) {
                let text = el.text().collect::<String>();
                if let Ok(n) = text.trim().parse::<u32>() {
                    pages.insert(n);
                } else if let Some(href) = el.value().attr("href") {
                    if let Some(c) = PAGE_NUM_RE.captures(href) {
                        if let Ok(n) = c[1].parse::<u32>() {
                            pages.insert(n);
                        }
                    }
                }
            }
        }
        if let Ok(selector) = Selector::parse("span.page-numbers, span.post-page-numbers, span.current") {
            for el in doc.html.select(&selector) {
                let text = el.text().collect::<String>();
                if let Ok(n) = text.trim().parse::<u32>() {
                    pages.insert(n);
                }
            }
        }

        pages.into_iter().collect()
    }

    fn page_url(base_url: &str, page: u32) -> String {
        if page == 1 {
            return base_url.to_string();
        }
        if base_url.ends_with('/') {
            format!("{base_url}{page}/")
        } else {
            format!("{base_url}/{page}/")
        }
    }

    async fn fetch_all_pages(&self, base_url: &str, pages: &[u32]) -> String {
        let selector = Selector::parse("div.gp-entry-content").unwrap();
        let mut parts = Vec::new();
        for &page in pages {
            let url = Self::page_url(base_url, page);
            match self.inner.fetch_article_content(&url).await {
                Ok(html) => {
                    let doc = HtmlDoc::parse_document(&html);
                    if let Some(el) = doc.html.select(&selector).next() {
                        parts.push(el.inner_html());
                    }
                }
                Err(e) => warn!(%url, error = %e, "failed to fetch mein-mmo page, skipping"),
            }
        }
        parts.join("\n\n")
    }
}

#[async_trait]
impl Aggregator for MeinMmoAggregator {
    fn aggregator_type(&self) -> &'static str {
        "mein_mmo"
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.inner.fetch_source_data(ctx).await
    }

    async fn parse_to_raw_articles(&self, _ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        let entries = {
            let mut parser = crate::rss::FeedParser::new();
            parser.parse(source_data)?.entries
        };

        let mut articles = Vec::new();
        for entry in entries.into_iter().take(limit) {
            let mut article = RawArticle::new(
                entry.url.clone(),
                entry.title,
                entry.published_at.unwrap_or_else(chrono::Utc::now),
            );

            let first_page = match self.inner.fetch_article_content(&article.identifier).await {
                Ok(html) => html,
                Err(e) if e.is_skippable() => continue,
                Err(e) => return Err(e),
            };

            let pages = Self::detect_page_numbers(&first_page);
            let combined = self.fetch_all_pages(&article.identifier, &pages).await;

            let mut fragment = HtmlDoc::parse_fragment(&combined);
            fragment.sanitize_class_names();
            fragment.clean_html();
            article.content = Some(crate::html::formatter::format_article_content(
                &fragment.to_html(),
                &crate::html::formatter::FormatOptions {
                    title: &article.name,
                    url: &article.identifier,
                    header_image_url: None,
                    comments_html: None,
                },
            ));

            articles.push(article);
        }

        Ok(articles)
    }
}
