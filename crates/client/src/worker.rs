//! The worker: owns the lifecycle, the strategy engine and the sweeper, and
//! intercepts requests once activate has claimed them.

use std::sync::Arc;

use url::Url;

use swcache_core::{AppConfig, Caches, Error, StoreNames};

use crate::fetch::{Fetcher, resolve};
use crate::lifecycle::{ActivateReport, Lifecycle, Phase};
use crate::strategy::{Served, Source, StrategyEngine};
use crate::sweeper::EvictionSweeper;

pub struct CacheWorker {
    origin: Url,
    caches: Caches,
    fetcher: Arc<dyn Fetcher>,
    lifecycle: Lifecycle,
    engine: StrategyEngine,
    sweeper: EvictionSweeper,
    stores: StoreNames,
}

impl CacheWorker {
    pub fn new(config: &AppConfig, caches: Caches, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin {}: {e}", config.origin)))?;

        Ok(Self {
            lifecycle: Lifecycle::from_config(config, origin.clone(), caches.clone(), Arc::clone(&fetcher)),
            engine: StrategyEngine::from_config(config, caches.clone(), Arc::clone(&fetcher)),
            sweeper: EvictionSweeper::from_config(config, caches.clone()),
            stores: config.store_names(),
            origin,
            caches,
            fetcher,
        })
    }

    pub async fn install(&self) -> Result<(), Error> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.lifecycle.activate().await
    }

    /// Install then activate.
    pub async fn start(&self) -> Result<ActivateReport, Error> {
        self.install().await?;
        self.activate().await
    }

    pub async fn phase(&self) -> Phase {
        self.lifecycle.phase().await
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle.is_ready()
    }

    /// Intercept a GET for `input`, absolute or relative to the origin.
    ///
    /// Before activate completes the request goes straight to the network.
    pub async fn fetch(&self, input: &str) -> Result<Served, Error> {
        let url = resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        if !self.lifecycle.is_ready() {
            let class = self.engine.classifier().classify(&url);
            tracing::debug!(url = %url, "not yet activated, passing through");
            let response = self.fetcher.fetch(&url).await?;
            return Ok(Served { response, source: Source::Network, class });
        }

        self.engine.handle(&url).await
    }

    /// Resolve `input` the way [`fetch`](Self::fetch) does.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn sweeper(&self) -> &EvictionSweeper {
        &self.sweeper
    }

    pub fn store_names(&self) -> &StoreNames {
        &self.stores
    }
}
