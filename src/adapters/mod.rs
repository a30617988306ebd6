pub mod full_website;
pub mod podcast;
pub mod reddit;
pub mod rss;
pub mod sites;
pub mod youtube;

use crate::error::{AggregatorError, Result};
use crate::header_extractor::HeaderElementExtractor;
use crate::html::formatter;
use crate::http_client::HttpClient;
use crate::image_service::ImageService;
use crate::pipeline::Aggregator;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared services every adapter is built from. Bundled so the registry's
/// factory closures stay small.
#[derive(Clone)]
pub struct AdapterServices {
    pub http: HttpClient,
    pub images: Arc<ImageService>,
    pub headers: Arc<HeaderElementExtractor>,
}

pub type AggregatorFactory = Arc<dyn Fn(&AdapterServices) -> Arc<dyn Aggregator> + Send + Sync>;

/// Maps a feed's `aggregator_tag` (e.g. `"rss"`, `"reddit"`, `"heise"`) to
/// a factory that builds the concrete adapter. A feed whose tag is absent
/// here can never run, by design — `AggregatorError::UnknownAggregator`.
pub struct AggregatorRegistry {
    factories: HashMap<&'static str, AggregatorFactory>,
    services: AdapterServices,
}

impl AggregatorRegistry {
    pub fn new(services: AdapterServices) -> Self {
        let mut registry = AggregatorRegistry { factories: HashMap::new(), services };
        registry.register("rss", |s| Arc::new(rss::RssAggregator::new(s.http.clone())));
        registry.register("website", |s| Arc::new(full_website::FullWebsiteAggregator::generic(s.clone())));
        registry.register("reddit", |s| Arc::new(reddit::RedditAggregator::new(s.clone())));
        registry.register("youtube", |s| Arc::new(youtube::YouTubeAggregator::new(s.http.clone())));
        registry.register("podcast", |s| Arc::new(podcast::PodcastAggregator::new(s.http.clone())));
        registry.register("heise", |s| Arc::new(sites::heise::HeiseAggregator::new(s.clone())));
        registry.register("merkur", |s| Arc::new(sites::merkur::MerkurAggregator::new(s.clone())));
        registry.register("tagesschau", |s| Arc::new(sites::tagesschau::TagesschauAggregator::new(s.clone())));
        registry.register("mein_mmo", |s| Arc::new(sites::mein_mmo::MeinMmoAggregator::new(s.clone())));
        registry.register("caschys_blog", |s| Arc::new(sites::caschys_blog::CaschysBlogAggregator::new(s.clone())));
        registry.register("dark_legacy", |s| Arc::new(sites::dark_legacy::DarkLegacyAggregator::new(s.clone())));
        registry.register("explosm", |s| Arc::new(sites::explosm::ExplosmAggregator::new(s.clone())));
        registry.register("oglaf", |s| Arc::new(sites::oglaf::OglafAggregator::new(s.clone())));
        registry.register("mactechnews", |s| Arc::new(sites::mactechnews::MacTechNewsAggregator::new(s.clone())));
        registry
    }

    fn register<F>(&mut self, tag: &'static str, factory: F)
    where
        F: Fn(&AdapterServices) -> Arc<dyn Aggregator> + Send + Sync + 'static,
    {
        self.factories.insert(tag, Arc::new(factory));
    }

    pub fn get(&self, tag: &str) -> Result<Arc<dyn Aggregator>> {
        self.factories
            .get(tag)
            .map(|f| f(&self.services))
            .ok_or_else(|| AggregatorError::UnknownAggregator { tag: tag.to_string() })
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

pub(crate) use formatter as content_formatter;
