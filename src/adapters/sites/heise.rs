use crate::adapters::full_website::FullWebsiteAggregator;
use crate::adapters::AdapterServices;
use crate::error::Result;
use crate::html::formatter::{format_article_content, FormatOptions};
use crate::html::toolkit::HtmlDoc;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::{default_filter_articles, Aggregator};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

const HEISE_URL: &str = "https://www.heise.de/";

static SKIP_TITLE_TERMS: &[&str] = &[
    "die Bilder der Woche",
    "Produktwerker",
    "heise-Angebot",
    "#TGIQF",
    "heise+",
    "#heiseshow:",
    "Mein Scrum ist kaputt",
    "software-architektur.tv",
    "Developer Snapshots",
];

static DISCUSSION_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""discussionUrl"\s*:\s*"([^"]+)""#).unwrap());

/// heise online: strips the multi-page split by forcing `?seite=all`,
/// drops editorial series that aren't "real" articles by title, and folds
/// in up to `max_comments` forum comments pulled from the linked
/// discussion thread.
pub struct HeiseAggregator {
    inner: FullWebsiteAggregator,
    include_comments: bool,
    max_comments: usize,
}

impl HeiseAggregator {
    pub fn new(services: AdapterServices) -> Self {
        let inner = FullWebsiteAggregator::new(
            services,
            "#meldung, .StoryContent",
            vec![
                "script".into(), "style".into(), "noscript".into(), "footer".into(), "aside".into(),
                ".ad-sensor".into(), ".a-teaser-branding".into(), ".overlay".into(),
                "iframe:not([src*='youtube.com']):not([src*='youtu.be'])".into(),
            ],
        );
        HeiseAggregator { inner, include_comments: true, max_comments: 5 }
    }

    fn all_pages_url(article_url: &str) -> String {
        if article_url.contains("seite=all") {
            article_url.to_string()
        } else if article_url.contains('?') {
            format!("{article_url}&seite=all")
        } else {
            format!("{article_url}?seite=all")
        }
    }

    async fn extract_comments(&self, article_html: &str) -> Option<String> {
        let discussion_url = DISCUSSION_URL_RE.captures(article_html).map(|c| c[1].to_string())?;
        let forum_html = self.inner.fetch_article_content(&discussion_url).await.ok()?;
        let doc = HtmlDoc::parse_document(&forum_html);
        let selector = scraper::Selector::parse(".posting, .comment").ok()?;
        let comments: Vec<String> = doc
            .html
            .select(&selector)
            .take(self.max_comments)
            .map(|el| format!("<div class=\"comment\">{}</div>", el.inner_html()))
            .collect();
        if comments.is_empty() {
            None
        } else {
            Some(comments.join("\n"))
        }
    }
}

#[async_trait]
impl Aggregator for HeiseAggregator {
    fn aggregator_type(&self) -> &'static str {
        "heise"
    }

    fn get_source_url(&self, _ctx: &FeedContext) -> String {
        HEISE_URL.to_string()
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.inner.fetch_source_data(ctx).await
    }

    async fn parse_to_raw_articles(&self, ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        // Reuse the generic feed parse, then re-fetch each article through
        // the all-pages URL instead of the base adapter's single fetch.
        let entries = {
            let mut parser = crate::rss::FeedParser::new();
            parser.parse(source_data)?.entries
        };

        let mut articles = Vec::new();
        for entry in entries.into_iter().take(limit) {
            if SKIP_TITLE_TERMS.iter().any(|t| entry.title.contains(t)) {
                continue;
            }

            let mut article = RawArticle::new(
                entry.url.clone(),
                entry.title,
                entry.published_at.unwrap_or_else(chrono::Utc::now),
            );

            let paged_url = Self::all_pages_url(&article.identifier);
            let html = match self.inner.fetch_article_content(&paged_url).await {
                Ok(html) => html,
                Err(e) if e.is_skippable() => {
                    warn!(url = %article.identifier, error = %e, "skipping heise article");
                    continue;
                }
                Err(e) => return Err(e),
            };
            article.raw_content = Some(html);
            articles.push(article);

            let _ = ctx;
        }

        Ok(articles)
    }

    fn filter_articles(&self, _ctx: &FeedContext, articles: Vec<RawArticle>) -> Vec<RawArticle> {
        default_filter_articles(articles)
    }

    async fn enrich_articles(&self, _ctx: &FeedContext, mut articles: Vec<RawArticle>) -> Result<Vec<RawArticle>> {
        for article in &mut articles {
            let Some(raw) = article.raw_content.clone() else { continue };

            let header = self.inner.extract_content(&raw).ok();
            let header_image_url = None::<String>;

            let cleaned = self.inner.extract_content(&raw)?;
            let mut fragment = HtmlDoc::parse_fragment(&cleaned);
            fragment.remove_empty_elements(&["p", "div", "span"]);
            let cleaned = fragment.to_html();

            if cleaned.to_lowercase().contains("event sourcing") {
                article.content = None;
                continue;
            }

            let comments = if self.include_comments { self.extract_comments(&raw).await } else { None };

            article.content = Some(format_article_content(
                &cleaned,
                &FormatOptions {
                    title: &article.name,
                    url: &article.identifier,
                    header_image_url: header_image_url.as_deref(),
                    comments_html: comments.as_deref(),
                },
            ));
            let _ = header;
        }
        Ok(articles.into_iter().filter(|a| a.content.is_some()).collect())
    }
}
