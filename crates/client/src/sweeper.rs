//! Eviction sweeper for the image store.
//!
//! The sweeper runs on its own timer, decoupled from the write path, and
//! trims the image store to its newest `capacity` entries:
//!
//! 1. List keys (oldest first)
//! 2. If there are more than `capacity`, delete the oldest `len - capacity`
//! 3. On a store error, abandon this tick; the next tick retries
//!
//! # Example
//!
//! ```ignore
//! let sweeper = EvictionSweeper::from_config(&config, caches);
//! tokio::spawn(sweeper.run(shutdown_token));
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use swcache_core::{AppConfig, Caches, Error};

/// Default interval between sweeps (60 seconds).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default number of image entries kept.
pub const DEFAULT_CAPACITY: usize = 100;

/// Periodic task bounding one store to its most recently added entries.
#[derive(Clone)]
pub struct EvictionSweeper {
    caches: Caches,
    store_name: String,
    capacity: usize,
    interval: Duration,
    /// Serializes sweeps so a manual sweep never interleaves with a tick.
    guard: Arc<Mutex<()>>,
}

impl EvictionSweeper {
    /// Creates a sweeper with default capacity and interval.
    pub fn new(caches: Caches, store_name: impl Into<String>) -> Self {
        Self {
            caches,
            store_name: store_name.into(),
            capacity: DEFAULT_CAPACITY,
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Sweeper over the configured image store.
    pub fn from_config(config: &AppConfig, caches: Caches) -> Self {
        Self::new(caches, config.store_names().images)
            .with_capacity(config.image_capacity)
            .with_interval(config.sweep_interval())
    }

    /// Sets a custom capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets a custom sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run one sweep. Returns how many entries were deleted.
    ///
    /// # Errors
    ///
    /// Returns the first store error; entries deleted before it stay deleted.
    pub async fn sweep(&self) -> Result<usize, Error> {
        let _guard = self.guard.lock().await;

        let store = self.caches.open(&self.store_name).await?;
        let keys = store.keys().await?;
        if keys.len() <= self.capacity {
            return Ok(0);
        }

        let excess = keys.len() - self.capacity;
        let mut deleted = 0;
        for key in keys.iter().take(excess) {
            if store.delete(key).await? {
                deleted += 1;
            }
        }

        info!(store = %self.store_name, deleted, kept = self.capacity, "evicted oldest entries");
        Ok(deleted)
    }

    /// Runs the sweeper until shutdown is signalled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            store = %self.store_name,
            capacity = self.capacity,
            interval_secs = self.interval.as_secs(),
            "eviction sweeper starting"
        );

        let mut interval = tokio::time::interval(self.interval);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("eviction sweeper shutting down");
                    break;
                }

                _ = interval.tick() => {
                    match self.sweep().await {
                        Ok(0) => debug!(store = %self.store_name, "sweep found nothing to evict"),
                        Ok(_) => {}
                        Err(e) => warn!(store = %self.store_name, error = %e, "sweep abandoned, retrying next tick"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use swcache_core::{CacheBackend, CacheEntry, Headers, RequestKey, Store};

    use super::*;
    use crate::testing::{AlwaysFailing, FailingBackend, memory_caches};

    const IMAGES: &str = "estate-images-v1";

    fn image_url(i: usize) -> String {
        format!("https://cdn.example.com/listing/{i}.webp")
    }

    async fn fill(store: &Store, count: usize) {
        for i in 0..count {
            let entry = CacheEntry {
                key: RequestKey::get(image_url(i)),
                status: 200,
                headers: Headers::new(),
                body: Bytes::from(vec![0u8; 4]),
                stored_at: chrono::Utc::now(),
            };
            store.put(&entry).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_sweep_keeps_most_recent_entries() {
        let caches = memory_caches().await;
        let store = caches.open(IMAGES).await.unwrap();
        fill(&store, 150).await;

        let sweeper = EvictionSweeper::new(caches, IMAGES);
        assert_eq!(sweeper.sweep().await.unwrap(), 50);

        let urls: Vec<String> = store.keys().await.unwrap().into_iter().map(|k| k.url).collect();
        let expected: Vec<String> = (50..150).map(image_url).collect();
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let caches = memory_caches().await;
        let store = caches.open(IMAGES).await.unwrap();
        fill(&store, 150).await;
        let sweeper = EvictionSweeper::new(caches, IMAGES);

        sweeper.sweep().await.unwrap();
        let after_first = store.keys().await.unwrap();

        assert_eq!(sweeper.sweep().await.unwrap(), 0);
        assert_eq!(store.keys().await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_sweep_under_capacity_is_noop() {
        let caches = memory_caches().await;
        let store = caches.open(IMAGES).await.unwrap();
        fill(&store, 100).await;

        let sweeper = EvictionSweeper::new(caches, IMAGES);
        assert_eq!(sweeper.sweep().await.unwrap(), 0);
        assert_eq!(store.keys().await.unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_sweep_custom_capacity() {
        let caches = memory_caches().await;
        let store = caches.open(IMAGES).await.unwrap();
        fill(&store, 5).await;

        let sweeper = EvictionSweeper::new(caches, IMAGES).with_capacity(2);
        assert_eq!(sweeper.sweep().await.unwrap(), 3);
        let urls: Vec<String> = store.keys().await.unwrap().into_iter().map(|k| k.url).collect();
        assert_eq!(urls, vec![image_url(3), image_url(4)]);
    }

    #[tokio::test]
    async fn test_sweep_reports_store_errors() {
        let caches = Caches::new(Arc::new(FailingBackend::new().await.fail_reads()));
        let sweeper = EvictionSweeper::new(caches, IMAGES);
        assert!(sweeper.sweep().await.is_err());
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig { image_capacity: 10, sweep_interval_secs: 5, ..Default::default() };
        let caches = Caches::new(Arc::new(AlwaysFailing));
        let sweeper = EvictionSweeper::from_config(&config, caches);
        assert_eq!(sweeper.store_name(), "estate-images-v1");
        assert_eq!(sweeper.capacity(), 10);
        assert_eq!(sweeper.interval, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_run_sweeps_on_tick_and_stops_on_cancel() {
        let caches = memory_caches().await;
        let store = caches.open(IMAGES).await.unwrap();
        fill(&store, 3).await;

        let sweeper = EvictionSweeper::new(caches, IMAGES)
            .with_capacity(1)
            .with_interval(Duration::from_millis(20));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        let mut remaining = store.keys().await.unwrap().len();
        for _ in 0..200 {
            if remaining == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            remaining = store.keys().await.unwrap().len();
        }
        assert_eq!(remaining, 1);
        assert_eq!(store.keys().await.unwrap()[0].url, image_url(2));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_run_retries_after_failed_tick() {
        let backend = Arc::new(FailingBackend::new().await.fail_first_read());
        let db = backend.db();
        let caches = Caches::new(backend.clone());
        fill(&caches.open(IMAGES).await.unwrap(), 3).await;

        let sweeper = EvictionSweeper::new(caches, IMAGES)
            .with_capacity(1)
            .with_interval(Duration::from_millis(20));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        let mut remaining = db.list_keys(IMAGES).await.unwrap().len();
        for _ in 0..200 {
            if remaining == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            remaining = db.list_keys(IMAGES).await.unwrap().len();
        }
        assert!(!backend.read_failure_pending());
        assert_eq!(remaining, 1);
        assert_eq!(db.list_keys(IMAGES).await.unwrap()[0].url, image_url(2));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }
}
