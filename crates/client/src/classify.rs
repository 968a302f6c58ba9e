//! Traffic classification.
//!
//! Maps a resolved request URL to the class that selects its caching
//! strategy. Image is checked before Api, so a URL that matches both (an
//! image extension under the API prefix) is an image.

use std::fmt;

use url::Url;

use swcache_core::AppConfig;

/// Traffic class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficClass {
    /// Served cache-first from the image store.
    Image,
    /// Served network-first from the API store.
    Api,
    /// Served stale-while-revalidate from the precache store.
    Other,
}

impl TrafficClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficClass::Image => "image",
            TrafficClass::Api => "api",
            TrafficClass::Other => "other",
        }
    }
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path and host heuristics that drive [`TrafficClass`].
#[derive(Debug, Clone)]
pub struct Classifier {
    image_extensions: Vec<String>,
    image_hosts: Vec<String>,
    api_prefix: String,
}

impl Classifier {
    pub fn new(image_extensions: Vec<String>, image_hosts: Vec<String>, api_prefix: impl Into<String>) -> Self {
        Self {
            image_extensions: image_extensions.into_iter().map(|e| e.to_lowercase()).collect(),
            image_hosts: image_hosts.into_iter().map(|h| h.to_lowercase()).collect(),
            api_prefix: api_prefix.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.image_extensions.clone(), config.image_hosts.clone(), config.api_prefix.clone())
    }

    pub fn classify(&self, url: &Url) -> TrafficClass {
        if self.is_image(url) {
            TrafficClass::Image
        } else if url.path().starts_with(&self.api_prefix) {
            TrafficClass::Api
        } else {
            TrafficClass::Other
        }
    }

    fn is_image(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();
        if self.image_extensions.iter().any(|ext| path.contains(ext.as_str())) {
            return true;
        }

        // host patterns are substrings: "hubspotusercontent" covers every regional bucket
        url.host_str()
            .map(|host| self.image_hosts.iter().any(|pattern| host.contains(pattern.as_str())))
            .unwrap_or(false)
    }
}
