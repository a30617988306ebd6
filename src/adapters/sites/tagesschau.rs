use crate::adapters::full_website::FullWebsiteAggregator;
use crate::adapters::AdapterServices;
use crate::error::Result;
use crate::html::toolkit::HtmlDoc;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use async_trait::async_trait;
use scraper::Selector;
use serde_json::Value;

/// tagesschau.de articles often center on an embedded media player rather
/// than prose. This looks for a `data-v="{...json...}"` player block,
/// pulls its stream list, and renders an `<audio>` or `<video>` element
/// from the best available stream instead of running the generic text
/// extractor over what is mostly player chrome.
pub struct TagesschauAggregator {
    inner: FullWebsiteAggregator,
}

impl TagesschauAggregator {
    pub fn new(services: AdapterServices) -> Self {
        let inner = FullWebsiteAggregator::new(
            services,
            "article, .textabsatz",
            vec!["script".into(), "style".into(), ".teaser-footer".into()],
        );
        TagesschauAggregator { inner }
    }

    fn decode_entities(s: &str) -> String {
        s.replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
    }

    fn extract_media_header(html: &str) -> Option<String> {
        let doc = HtmlDoc::parse_document(html);
        let selector = Selector::parse("div[data-v]").ok()?;

        let mut best: Option<String> = None;
        for el in doc.html.select(&selector) {
            let class_attr = el.value().attr("class").unwrap_or("").to_lowercase();
            if !class_attr.contains("mediaplayer") {
                continue;
            }
            let Some(data_v) = el.value().attr("data-v") else { continue };
            let decoded = Self::decode_entities(data_v);
            let Ok(parsed) = serde_json::from_str::<Value>(&decoded) else { continue };

            let streams = parsed.pointer("/mc/streams").and_then(Value::as_array);
            let Some(streams) = streams else { continue };
            let is_audio_only = streams.iter().all(|s| s.get("isAudioOnly").and_then(Value::as_bool).unwrap_or(false));

            let stream_url = streams
                .iter()
                .rev()
                .find_map(|s| s.get("media").and_then(Value::as_str))
                .map(str::to_string);

            if let Some(url) = stream_url {
                best = Some(if is_audio_only {
                    format!("<audio controls preload=\"metadata\"><source src=\"{url}\"></audio>")
                } else {
                    format!("<video controls preload=\"metadata\" style=\"max-width:100%;\"><source src=\"{url}\"></video>")
                });
                break;
            }
        }
        best
    }
}

#[async_trait]
impl Aggregator for TagesschauAggregator {
    fn aggregator_type(&self) -> &'static str {
        "tagesschau"
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

            let html = match self.inner.fetch_article_content(&article.identifier).await {
                Ok(html) => html,
                Err(e) if e.is_skippable() => continue,
                Err(e) => return Err(e),
            };

            let media_html = Self::extract_media_header(&html);
            let text = self.inner.extract_content(&html).unwrap_or_default();

            let mut body = String::new();
            if let Some(media) = media_html {
                body.push_str(&media);
                body.push('\n');
            }
            body.push_str(&text);

            article.content = Some(crate::html::formatter::format_article_content(
                &body,
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
