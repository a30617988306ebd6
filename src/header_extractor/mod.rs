//! Header-element extraction: turns an article's source URL into a single
//! HTML fragment (an embed iframe or an `<img>`) used as the article's
//! visual header. Implemented as a strategy chain — the first strategy
//! that claims a URL builds the element; later ones never run.

mod generic_image;
mod reddit_embed;
mod reddit_post;
mod youtube;

use crate::error::Result;
use crate::http_client::HttpClient;
use crate::image_service::ImageService;
use async_trait::async_trait;

pub struct HeaderElementData {
    pub html: String,
    pub image_url: Option<String>,
    pub base64_data_uri: Option<String>,
}

#[async_trait]
pub trait HeaderElementStrategy: Send + Sync {
    fn can_handle(&self, url: &str) -> bool;
    async fn create(&self, url: &str) -> Result<Option<HeaderElementData>>;
}

pub struct HeaderElementExtractor {
    strategies: Vec<Box<dyn HeaderElementStrategy>>,
}

impl HeaderElementExtractor {
    pub fn new(http: HttpClient, images: ImageService) -> Self {
        let images = std::sync::Arc::new(images);
        HeaderElementExtractor {
            strategies: vec![
                Box::new(reddit_embed::RedditEmbedStrategy),
                Box::new(reddit_post::RedditPostStrategy::new(http.clone(), images.clone())),
                Box::new(youtube::YouTubeStrategy),
                Box::new(generic_image::GenericImageStrategy::new(http, images)),
            ],
        }
    }

    /// Runs the chain in order. A strategy that errors with a skippable
    /// error propagates (the caller treats the whole article as skipped);
    /// any other failure is swallowed and the chain moves to the next
    /// candidate, since a missing header image is never fatal on its own.
    pub async fn extract(&self, url: &str) -> Result<Option<HeaderElementData>> {
        for strategy in &self.strategies {
            if !strategy.can_handle(url) {
                continue;
            }
            match strategy.create(url).await {
                Ok(Some(data)) => return Ok(Some(data)),
                Ok(None) => return Ok(None),
                Err(e) if e.is_skippable() => return Err(e),
                Err(_) => continue,
            }
        }
        Ok(None)
    }
}
