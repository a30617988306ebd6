use crate::error::Result;
use crate::http_client::HttpClient;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use crate::rss::FeedParser;
use async_trait::async_trait;

const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".ogg", ".opus", ".wav"];

fn looks_like_audio(url: &str, mime: Option<&str>) -> bool {
    if let Some(mime) = mime {
        if mime.starts_with("audio/") {
            return true;
        }
    }
    AUDIO_EXTENSIONS.iter().any(|ext| url.to_lowercase().ends_with(ext))
}

fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Podcast feeds are RSS feeds whose interesting content is an audio
/// enclosure rather than the entry body. Entries without a recognizable
/// audio enclosure are skipped outright — there is nothing for this
/// adapter to play. The rendered body is an `<audio>` player plus the
/// feed's own show-notes HTML, not an extracted web page.
pub struct PodcastAggregator {
    http: HttpClient,
}

impl PodcastAggregator {
    pub fn new(http: HttpClient) -> Self {
        PodcastAggregator { http }
    }
}

#[async_trait]
impl Aggregator for PodcastAggregator {
    fn aggregator_type(&self) -> &'static str {
        "podcast"
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.http.get_text(&ctx.identifier, None).await
    }

    async fn parse_to_raw_articles(&self, ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        let artwork_size: u32 = ctx.options.get("artwork_size").and_then(|v| v.parse().ok()).unwrap_or(300);
        let include_player = ctx.options.get("include_player").map(|v| v == "true").unwrap_or(true);
        let include_download_link = ctx.options.get("include_download_link").map(|v| v == "true").unwrap_or(true);

        let mut parser = FeedParser::new();
        let entries = parser.parse(source_data)?.entries;

        let mut articles = Vec::new();
        for entry in entries.into_iter().take(limit) {
            let Some(enclosure) = entry.enclosures.iter().find(|e| looks_like_audio(&e.url, e.mime_type.as_deref())) else {
                continue;
            };

            let mut article = RawArticle::new(
                entry.url.clone(),
                entry.title.clone(),
                entry.published_at.unwrap_or_else(chrono::Utc::now),
            );
            article.author = entry.author.clone();

            let mut body = String::new();
            if let Some(image) = &entry.image_url {
                body.push_str(&format!(
                    "<div><img src=\"{image}\" alt=\"{}\" style=\"max-width:{artwork_size}px\"></div>\n",
                    entry.title
                ));
                article.icon = Some(image.clone());
            }

            if include_player {
                body.push_str(&format!(
                    "<audio controls preload=\"metadata\"><source src=\"{}\"></audio>\n",
                    enclosure.url
                ));
            }

            let mut meta_parts = Vec::new();
            if let Some(duration) = entry.duration_seconds {
                meta_parts.push(format_duration(duration));
            }
            if include_download_link {
                meta_parts.push(format!("<a href=\"{}\">Download</a>", enclosure.url));
            }
            if !meta_parts.is_empty() {
                body.push_str(&format!("<p>{}</p>\n", meta_parts.join(" | ")));
            }

            if let Some(notes) = &entry.summary {
                body.push_str("<h4>Show Notes</h4>\n");
                body.push_str(notes);
            }

            article.content = Some(body);
            articles.push(article);
        }

        Ok(articles)
    }
}
