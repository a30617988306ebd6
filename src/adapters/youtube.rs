use crate::error::Result;
use crate::http_client::HttpClient;
use crate::pipeline::types::{FeedContext, RawArticle};
use crate::pipeline::Aggregator;
use crate::rss::FeedParser;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

const DEFAULT_COMMENT_LIMIT: usize = 10;

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Fetches top-level comments via the YouTube Data API's `commentThreads`
/// endpoint. Requires a per-feed API key (`ctx.options["youtube_api_key"]`);
/// feeds without one simply render without a comments section rather than
/// failing the run, consistent with this crate's public-endpoint-first
/// approach to the Reddit/YouTube adapters.
async fn fetch_top_comments(http: &HttpClient, api_key: &str, video_id: &str, limit: usize) -> Vec<(String, String)> {
    if limit == 0 {
        return Vec::new();
    }
    let url = format!(
        "https://www.googleapis.com/youtube/v3/commentThreads?part=snippet&videoId={video_id}&maxResults={}&order=relevance&textFormat=plainText&key={api_key}",
        limit.min(100)
    );

    let body = match http.get_text(&url, None).await {
        Ok(b) => b,
        Err(e) => {
            warn!(video_id, error = %e, "failed to fetch youtube comments, continuing without them");
            return Vec::new();
        }
    };
    let json: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(video_id, error = %e, "invalid youtube commentThreads json");
            return Vec::new();
        }
    };
    let Some(items) = json.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let snippet = item.pointer("/snippet/topLevelComment/snippet")?;
            let text = snippet.get("textDisplay").and_then(Value::as_str)?;
            if text.is_empty() || text == "[deleted]" || text == "[removed]" {
                return None;
            }
            let author = snippet.get("authorDisplayName").and_then(Value::as_str).unwrap_or("Unknown").to_string();
            Some((author, text.to_string()))
        })
        .take(limit)
        .collect()
}

fn comment_blockquotes_html(comments: &[(String, String)]) -> String {
    if comments.is_empty() {
        return String::new();
    }
    let mut html = String::from("<h4>Comments</h4>");
    for (author, text) in comments {
        html.push_str(&format!(
            "<blockquote><p><strong>{}</strong></p><div>{}</div></blockquote>",
            escape_html(author),
            escape_html(text)
        ));
    }
    html
}

/// YouTube channels are aggregated via their public "uploads" RSS feed
/// (`/feeds/videos.xml?channel_id=...`), which needs no API key. The
/// identifier may be a channel ID (`UC...`) or an `@handle`; both resolve
/// to the same feed endpoint shape YouTube itself supports. The header
/// embed and the body's video player both route through the local
/// `/api/youtube-proxy` endpoint rather than embedding YouTube directly.
pub struct YouTubeAggregator {
    http: HttpClient,
}

impl YouTubeAggregator {
    pub fn new(http: HttpClient) -> Self {
        YouTubeAggregator { http }
    }

    fn feed_url(identifier: &str) -> String {
        if identifier.starts_with("UC") {
            format!("https://www.youtube.com/feeds/videos.xml?channel_id={identifier}")
        } else {
            let handle = identifier.trim_start_matches('@');
            format!("https://www.youtube.com/feeds/videos.xml?user={handle}")
        }
    }

    fn embed_html(video_id: &str) -> String {
        format!(
            r#"<div class="youtube-embed-container"><style>.youtube-embed-container{{position:relative;padding-bottom:56.25%;height:0;overflow:hidden;}}.youtube-embed-container iframe{{position:absolute;top:0;left:0;width:100%;height:100%;border:0;}}</style><iframe src="/api/youtube-proxy?v={video_id}" allowfullscreen></iframe></div>"#
        )
    }

    fn video_id_from_url(url: &str) -> Option<String> {
        url.split("v=")
            .nth(1)
            .map(|s| s.split('&').next().unwrap_or(s).to_string())
            .or_else(|| url.rsplit('/').next().map(str::to_string))
    }
}

#[async_trait]
impl Aggregator for YouTubeAggregator {
    fn aggregator_type(&self) -> &'static str {
        "youtube"
    }

    fn get_source_url(&self, ctx: &FeedContext) -> String {
        if ctx.identifier.starts_with("UC") {
            format!("https://youtube.com/channel/{}", ctx.identifier)
        } else {
            format!("https://youtube.com/{}", ctx.identifier.trim_start_matches('@'))
        }
    }

    async fn fetch_source_data(&self, ctx: &FeedContext) -> Result<String> {
        self.http.get_text(&Self::feed_url(&ctx.identifier), None).await
    }

    async fn parse_to_raw_articles(&self, ctx: &FeedContext, source_data: &str, limit: usize) -> Result<Vec<RawArticle>> {
        let api_key = ctx.options.get("youtube_api_key").cloned();
        let comment_limit =
            ctx.options.get("comment_limit").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_COMMENT_LIMIT);

        let mut parser = FeedParser::new();
        let entries = parser.parse(source_data)?.entries;

        let mut articles = Vec::new();
        for entry in entries.into_iter().take(limit) {
            let mut article = RawArticle::new(
                entry.url.clone(),
                entry.title,
                entry.published_at.unwrap_or_else(chrono::Utc::now),
            );

            let description = entry.summary.unwrap_or_default();
            if let Some(id) = Self::video_id_from_url(&entry.url) {
                article.icon = Some(Self::embed_html(&id));

                let comments = match &api_key {
                    Some(key) if !key.is_empty() => {
                        fetch_top_comments(&self.http, key, &id, comment_limit).await
                    }
                    _ => Vec::new(),
                };

                let mut body = format!("<div class=\"youtube-description\">{}</div>", description.replace('\n', "<br>"));
                body.push_str(&comment_blockquotes_html(&comments));
                article.content = Some(body);
            } else {
                article.content = Some(description);
            }

            articles.push(article);
        }

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_html_points_at_the_local_proxy() {
        let html = YouTubeAggregator::embed_html("dQw4w9WgXcQ");
        assert!(html.contains("/api/youtube-proxy?v=dQw4w9WgXcQ"));
        assert!(!html.contains("youtube-nocookie.com"));
    }

    #[test]
    fn extracts_video_id_from_watch_url() {
        assert_eq!(
            YouTubeAggregator::video_id_from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn builds_comment_blockquotes() {
        let comments = vec![("alice".to_string(), "nice video".to_string())];
        let html = comment_blockquotes_html(&comments);
        assert!(html.contains("<blockquote>"));
        assert!(html.contains("alice"));
        assert!(html.contains("nice video"));
    }

    #[test]
    fn renders_no_comments_section_when_empty() {
        assert_eq!(comment_blockquotes_html(&[]), "");
    }
}
