//! Strategy engine.
//!
//! Each traffic class is bound to one caching algorithm and one store:
//!
//! | Class | Strategy | Store |
//! |---|---|---|
//! | Image | cache-first | images |
//! | Api | network-first with TTL | api |
//! | Other | stale-while-revalidate | precache |
//!
//! Cache-first and stale-while-revalidate share one implementation; only the
//! store differs. Store failures never reach the caller while a network
//! result is available: they are logged and the request carries on as if the
//! cache were empty.

mod cache_first;
mod network_first;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use url::Url;

use swcache_core::{AppConfig, Caches, Error, Store, StoreNames};

use crate::classify::{Classifier, TrafficClass};
use crate::fetch::{Fetcher, NetworkResponse};

/// Caching algorithm applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn for_class(class: TrafficClass) -> Self {
        match class {
            TrafficClass::Image => Strategy::CacheFirst,
            TrafficClass::Api => Strategy::NetworkFirst,
            TrafficClass::Other => Strategy::StaleWhileRevalidate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Network,
    Cache,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Network => "network",
            Source::Cache => "cache",
        }
    }
}

/// A response handed back to the caller.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: NetworkResponse,
    pub source: Source,
    pub class: TrafficClass,
}

/// Runs the per-class caching algorithms against the named stores.
pub struct StrategyEngine {
    caches: Caches,
    fetcher: Arc<dyn Fetcher>,
    classifier: Classifier,
    stores: StoreNames,
    api_ttl: Duration,
    refreshes: TaskTracker,
}

impl StrategyEngine {
    pub fn new(
        caches: Caches, fetcher: Arc<dyn Fetcher>, classifier: Classifier, stores: StoreNames, api_ttl: Duration,
    ) -> Self {
        Self { caches, fetcher, classifier, stores, api_ttl, refreshes: TaskTracker::new() }
    }

    pub fn from_config(config: &AppConfig, caches: Caches, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::new(caches, fetcher, Classifier::from_config(config), config.store_names(), config.api_ttl())
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Classify `url` and serve it with the strategy bound to its class.
    pub async fn handle(&self, url: &Url) -> Result<Served, Error> {
        let class = self.classifier.classify(url);
        let strategy = Strategy::for_class(class);
        tracing::debug!(url = %url, class = %class, strategy = %strategy, "routing request");

        let (response, source) = match class {
            TrafficClass::Image => self.cache_first(&self.stores.images, url).await?,
            TrafficClass::Api => self.network_first(&self.stores.api, url, self.api_ttl).await?,
            TrafficClass::Other => self.cache_first(&self.stores.precache, url).await?,
        };

        Ok(Served { response, source, class })
    }

    /// Wait until every background refresh spawned so far has finished.
    #[cfg(test)]
    pub(crate) async fn wait_for_refreshes(&self) {
        self.refreshes.close();
        self.refreshes.wait().await;
        self.refreshes.reopen();
    }

    /// Number of background refreshes still running.
    #[cfg(test)]
    pub(crate) fn pending_refreshes(&self) -> usize {
        self.refreshes.len()
    }

    /// Open a store, logging and swallowing failures.
    async fn open_store(&self, name: &str) -> Option<Store> {
        match self.caches.open(name).await {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(store = name, error = %e, "store unavailable, bypassing cache");
                None
            }
        }
    }
}

/// Put `response` into `store`, logging and swallowing failures.
async fn store_response(store: &Store, response: &NetworkResponse) {
    let entry = response.to_entry(chrono::Utc::now());
    if let Err(e) = store.put(&entry).await {
        tracing::warn!(store = store.name(), key = %entry.key, error = %e, "cache put failed");
    }
}
