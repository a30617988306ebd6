use super::{HeaderElementData, HeaderElementStrategy};
use crate::error::Result;
use crate::html::toolkit::HtmlDoc;
use crate::http_client::HttpClient;
use crate::image_service::ImageService;
use async_trait::async_trait;
use scraper::Selector;
use std::sync::Arc;

/// Fallback strategy: fetches the article page itself and looks for
/// `og:image`, then `twitter:image`, then the first sufficiently large
/// `<img>`. Last in the chain — everything more specific has already had
/// its chance. Explicitly refuses bare (non-embed) `v.redd.it` links,
/// since those point at a raw video asset, not an HTML page to scrape.
pub struct GenericImageStrategy {
    http: HttpClient,
    images: Arc<ImageService>,
}

impl GenericImageStrategy {
    pub fn new(http: HttpClient, images: Arc<ImageService>) -> Self {
        GenericImageStrategy { http, images }
    }

    fn find_candidate_image_url(&self, html: &str, base_url: &str) -> Option<String> {
        let doc = HtmlDoc::parse_document(html);

        for selector in ["meta[property=\"og:image\"]", "meta[name=\"twitter:image\"]"] {
            if let Ok(sel) = Selector::parse(selector) {
                if let Some(el) = doc.html.select(&sel).next() {
                    if let Some(content) = el.value().attr("content") {
                        return Some(resolve(base_url, content));
                    }
                }
            }
        }

        if let Ok(sel) = Selector::parse("img") {
            for el in doc.html.select(&sel) {
                let width: u32 = el.value().attr("width").and_then(|v| v.parse().ok()).unwrap_or(0);
                let height: u32 = el.value().attr("height").and_then(|v| v.parse().ok()).unwrap_or(0);
                if width > 0 && height > 0 && (width < 200 || height < 200) {
                    continue;
                }
                if let Some(src) = el.value().attr("src") {
                    if !src.starts_with("data:") {
                        return Some(resolve(base_url, src));
                    }
                }
            }
        }

        None
    }
}

fn resolve(base: &str, maybe_relative: &str) -> String {
    url::Url::parse(base)
        .and_then(|b| b.join(maybe_relative))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| maybe_relative.to_string())
}

#[async_trait]
impl HeaderElementStrategy for GenericImageStrategy {
    fn can_handle(&self, url: &str) -> bool {
        !(url.contains("v.redd.it") && !url.contains("/embed"))
    }

    async fn create(&self, url: &str) -> Result<Option<HeaderElementData>> {
        let page = self.http.get_text(url, None).await?;
        let Some(image_url) = self.find_candidate_image_url(&page, url) else { return Ok(None) };

        match self.images.fetch_and_compress(&image_url, true).await {
            Ok(compressed) => Ok(Some(HeaderElementData {
                html: format!(
                    "<p><img src=\"{}\" alt=\"\" style=\"max-width:100%;height:auto;\"></p>",
                    compressed.data_uri
                ),
                image_url: Some(image_url),
                base64_data_uri: Some(compressed.data_uri),
            })),
            Err(e) if e.is_skippable() => Err(e),
            Err(_) => Ok(None),
        }
    }
}
