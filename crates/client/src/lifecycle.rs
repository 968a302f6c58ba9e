//! Install / activate / claim.
//!
//! Install warms the precache store with the app shell. Activate removes
//! every store left behind by an older version tag, then signals readiness
//! so requests start going through the strategy engine.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use url::Url;

use swcache_core::{AppConfig, Caches, Error, StoreNames};

use crate::fetch::{Fetcher, NetworkResponse, resolve};

/// Lifecycle phase. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Installed,
    Activated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Pending => "pending",
            Phase::Installed => "installed",
            Phase::Activated => "activated",
        })
    }
}

/// Outcome of the activate cleanup.
#[derive(Debug, Default)]
pub struct ActivateReport {
    /// Stale stores that were removed.
    pub deleted: Vec<String>,
    /// Stale stores that could not be removed.
    pub failed: Vec<Error>,
}

pub struct Lifecycle {
    caches: Caches,
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
    precache_urls: Vec<String>,
    stores: StoreNames,
    phase: Mutex<Phase>,
    ready: watch::Sender<bool>,
}

impl Lifecycle {
    pub fn new(
        caches: Caches, fetcher: Arc<dyn Fetcher>, origin: Url, precache_urls: Vec<String>, stores: StoreNames,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self { caches, fetcher, origin, precache_urls, stores, phase: Mutex::new(Phase::Pending), ready }
    }

    pub fn from_config(config: &AppConfig, origin: Url, caches: Caches, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::new(caches, fetcher, origin, config.precache_urls.clone(), config.store_names())
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.lock().await
    }

    /// Whether activate has completed and requests should be intercepted.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Receiver that flips to `true` once activate completes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Open the current stores and populate the precache.
    ///
    /// Every precache URL is fetched before anything is written, so a failed
    /// fetch leaves the precache untouched. A failed put can leave earlier
    /// entries behind; the phase stays `Pending` and a retry overwrites them.
    pub async fn install(&self) -> Result<(), Error> {
        let mut phase = self.phase.lock().await;
        if *phase != Phase::Pending {
            return Err(Error::Lifecycle(format!("install requested while {}", *phase)));
        }

        for name in self.stores.all() {
            self.caches.open(name).await?;
        }

        let mut responses = Vec::with_capacity(self.precache_urls.len());
        for path in &self.precache_urls {
            responses.push(self.fetch_precache(path).await?);
        }

        let precache = self.caches.open(&self.stores.precache).await?;
        let stored_at = chrono::Utc::now();
        for response in &responses {
            precache.put(&response.to_entry(stored_at)).await?;
        }

        *phase = Phase::Installed;
        tracing::info!(store = precache.name(), assets = responses.len(), "install complete");
        Ok(())
    }

    async fn fetch_precache(&self, path: &str) -> Result<NetworkResponse, Error> {
        let install_err = |reason: String| Error::Install { url: path.to_string(), reason };

        let url = resolve(&self.origin, path).map_err(|e| install_err(e.to_string()))?;
        let response = self.fetcher.fetch(&url).await.map_err(|e| install_err(e.to_string()))?;
        if !response.is_ok() {
            return Err(install_err(format!("status {}", response.status.as_u16())));
        }
        Ok(response)
    }

    /// Delete every store outside the current allow-list, then claim.
    ///
    /// Cleanup is best effort: failures are logged and collected in the
    /// report. Readiness is signalled regardless.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let mut phase = self.phase.lock().await;
        if *phase != Phase::Installed {
            return Err(Error::Lifecycle(format!("activate requested while {}", *phase)));
        }

        let mut report = ActivateReport::default();
        for name in self.caches.names().await? {
            if self.stores.contains(&name) {
                continue;
            }
            match self.caches.delete(&name).await {
                Ok(_) => {
                    tracing::info!(store = %name, "deleted stale store");
                    report.deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(store = %name, error = %e, "failed to delete stale store");
                    report.failed.push(Error::ActivateCleanup { store: name, reason: e.to_string() });
                }
            }
        }

        *phase = Phase::Activated;
        self.ready.send_replace(true);
        tracing::info!(deleted = report.deleted.len(), failed = report.failed.len(), "activated, claiming requests");
        Ok(report)
    }
}
