use super::{HeaderElementData, HeaderElementStrategy};
use crate::error::Result;
use crate::http_client::HttpClient;
use crate::image_service::ImageService;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

const REDDIT_API_BASE: &str = "https://www.reddit.com";

static COMMENTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/r/(\w+)/comments/").unwrap());

pub fn is_reddit_url(url: &str) -> bool {
    url.contains("reddit.com") || url.contains("v.redd.it") || url.contains("vxreddit.com")
}

fn fix_reddit_media_url(url: &str) -> String {
    decode_html_entities(url).replace("&amp;", "&")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

fn decode_html_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Fetches a subreddit's community icon from the public (no-auth)
/// `about.json` endpoint and wraps it as a compressed header image. Second
/// in the chain: it needs a subreddit name, which only a `/r/<name>/...`
/// URL carries.
pub struct RedditPostStrategy {
    http: HttpClient,
    images: Arc<ImageService>,
}

impl RedditPostStrategy {
    pub fn new(http: HttpClient, images: Arc<ImageService>) -> Self {
        RedditPostStrategy { http, images }
    }

    async fn fetch_subreddit_icon(&self, subreddit: &str) -> Option<String> {
        let url = format!("{REDDIT_API_BASE}/r/{subreddit}/about.json");
        let body = self.http.get_text(&url, None).await.ok()?;
        let json: Value = serde_json::from_str(&body).ok()?;
        let data = json.get("data")?;
        let icon = data
            .get("icon_img")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| data.get("community_icon").and_then(Value::as_str).filter(|s| !s.is_empty()))?;
        Some(fix_reddit_media_url(icon))
    }
}

#[async_trait]
impl HeaderElementStrategy for RedditPostStrategy {
    fn can_handle(&self, url: &str) -> bool {
        is_reddit_url(url) && !super::reddit_embed::is_reddit_embed_url(url)
    }

    async fn create(&self, url: &str) -> Result<Option<HeaderElementData>> {
        let Some(caps) = COMMENTS_RE.captures(url) else { return Ok(None) };
        let subreddit = &caps[1];
        let Some(icon_url) = self.fetch_subreddit_icon(subreddit).await else { return Ok(None) };

        match self.images.fetch_and_compress(&icon_url, true).await {
            Ok(compressed) => Ok(Some(HeaderElementData {
                html: format!(
                    "<p><img src=\"{}\" alt=\"{}\" style=\"max-width:100%;height:auto;\"></p>",
                    compressed.data_uri,
                    escape_attr(&format!("r/{subreddit}"))
                ),
                image_url: Some(icon_url),
                base64_data_uri: Some(compressed.data_uri),
            })),
            Err(e) if e.is_skippable() => Err(e),
            Err(_) => Ok(None),
        }
    }
}
