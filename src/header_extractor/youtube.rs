use super::{HeaderElementData, HeaderElementStrategy};
use crate::error::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static YOUTUBE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/(?:watch\?v=|embed/|shorts/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)")
        .unwrap()
});

pub fn extract_video_id(url: &str) -> Option<String> {
    YOUTUBE_RE.captures(url).map(|c| c[1].to_string())
}

fn embed_html(video_id: &str) -> String {
    format!(
        r#"<div class="youtube-embed-container">
<style>
.youtube-embed-container {{ position: relative; padding-bottom: 56.25%; height: 0; overflow: hidden; }}
.youtube-embed-container iframe {{ position: absolute; top: 0; left: 0; width: 100%; height: 100%; border: 0; }}
</style>
<iframe src="/api/youtube-proxy?v={video_id}" allowfullscreen></iframe>
</div>"#
    )
}

/// Wraps a YouTube watch/shorts/embed URL in a responsive iframe pointed at
/// the local `/api/youtube-proxy` endpoint rather than YouTube directly.
/// Third in the chain, after the two Reddit-specific strategies.
pub struct YouTubeStrategy;

#[async_trait]
impl HeaderElementStrategy for YouTubeStrategy {
    fn can_handle(&self, url: &str) -> bool {
        extract_video_id(url).is_some()
    }

    async fn create(&self, url: &str) -> Result<Option<HeaderElementData>> {
        let Some(id) = extract_video_id(url) else { return Ok(None) };
        Ok(Some(HeaderElementData { html: embed_html(&id), image_url: None, base64_data_uri: None }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_from_common_url_shapes() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
        assert_eq!(extract_video_id("https://www.youtube.com/v/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));
        assert_eq!(extract_video_id("https://example.com/not-youtube"), None);
    }

    #[test]
    fn rejects_ids_that_are_not_exactly_eleven_characters() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQextra"), None);
    }

    #[test]
    fn embed_html_points_at_the_local_proxy() {
        let html = embed_html("dQw4w9WgXcQ");
        assert!(html.contains("/api/youtube-proxy?v=dQw4w9WgXcQ"));
        assert!(!html.contains("youtube-nocookie.com"));
    }
}
