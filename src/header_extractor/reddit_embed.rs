use super::{HeaderElementData, HeaderElementStrategy};
use crate::error::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static POST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/r/(\w+)/comments/([a-zA-Z0-9]+)").unwrap());

pub fn is_reddit_embed_url(url: &str) -> bool {
    url.contains("vxreddit.com") || (url.contains("/embed") && (url.contains("reddit.com") || url.contains("v.redd.it")))
}

fn responsive_embed_html(embed_url: &str, caption: &str) -> String {
    format!(
        r#"<div class="reddit-embed-container">
<style>
.reddit-embed-container {{ position: relative; padding-bottom: 56.25%; height: 0; overflow: hidden; }}
.reddit-embed-container iframe {{ position: absolute; top: 0; left: 0; width: 100%; height: 100%; border: 0; }}
@media (max-width: 512px) {{ .reddit-embed-container {{ padding-bottom: 75%; }} }}
</style>
<iframe src="{embed_url}" allowfullscreen></iframe>
{caption}
</div>"#,
        embed_url = embed_url,
        caption = if caption.is_empty() { String::new() } else { format!("<p>{caption}</p>") }
    )
}

/// Handles `vxreddit.com` links and `reddit.com`/`v.redd.it` `/embed` URLs
/// by wrapping them in a responsive 16:9 iframe. Runs first in the chain
/// because it needs no network call and nothing downstream should ever
/// second-guess an explicit embed link.
pub struct RedditEmbedStrategy;

#[async_trait]
impl HeaderElementStrategy for RedditEmbedStrategy {
    fn can_handle(&self, url: &str) -> bool {
        is_reddit_embed_url(url)
    }

    async fn create(&self, url: &str) -> Result<Option<HeaderElementData>> {
        let caption = POST_RE
            .captures(url)
            .map(|c| format!("r/{}", &c[1]))
            .unwrap_or_default();
        Ok(Some(HeaderElementData {
            html: responsive_embed_html(url, &caption),
            image_url: None,
            base64_data_uri: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_embed_urls() {
        assert!(is_reddit_embed_url("https://vxreddit.com/r/rust/comments/abc123"));
        assert!(is_reddit_embed_url("https://www.reddit.com/r/rust/comments/abc123/embed"));
        assert!(!is_reddit_embed_url("https://www.reddit.com/r/rust/comments/abc123"));
    }
}
