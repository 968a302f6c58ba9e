//! Store abstraction used by the strategy engine, sweeper and lifecycle.
//!
//! [`CacheBackend`] is the storage seam. [`Caches`] and [`Store`] are cheap,
//! cloneable handles on top of it: `Caches` addresses the set of named
//! stores, `Store` one open partition.

use std::fmt;
use std::sync::Arc;

use super::entry::{CacheEntry, RequestKey};
use crate::Error;

/// Durable key-value storage partitioned by store name.
///
/// Every method is atomic on its own; no caller needs multi-key
/// transactions. Failures are reported as [`Error::Store`].
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Create the named store if it does not exist. Idempotent.
    async fn create_store(&self, name: &str) -> Result<(), Error>;

    /// Exact-match lookup.
    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error>;

    /// Upsert. A replaced entry moves to the newest insertion position.
    async fn put(&self, store: &str, entry: &CacheEntry) -> Result<(), Error>;

    /// Returns whether an entry was present and removed.
    async fn delete(&self, store: &str, key: &RequestKey) -> Result<bool, Error>;

    /// Keys ordered by insertion time, oldest first.
    async fn list_keys(&self, store: &str) -> Result<Vec<RequestKey>, Error>;

    /// Remove a store and all its entries. Returns whether it existed.
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;

    /// Names of every store currently present.
    async fn list_store_names(&self) -> Result<Vec<String>, Error>;
}

/// Handle to the set of named stores.
#[derive(Clone)]
pub struct Caches {
    backend: Arc<dyn CacheBackend>,
}

impl fmt::Debug for Caches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caches").finish_non_exhaustive()
    }
}

impl Caches {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Open a store by name, creating it on first use.
    pub async fn open(&self, name: &str) -> Result<Store, Error> {
        self.backend.create_store(name).await?;
        Ok(Store { backend: Arc::clone(&self.backend), name: name.to_string() })
    }

    /// Delete a store and everything in it.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.backend.delete_store(name).await
    }

    /// Names of every store currently present.
    pub async fn names(&self) -> Result<Vec<String>, Error> {
        self.backend.list_store_names().await
    }
}

/// Handle to one open store.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn CacheBackend>,
    name: String,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Store {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        self.backend.get(&self.name, key).await
    }

    pub async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        self.backend.put(&self.name, entry).await
    }

    pub async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        self.backend.delete(&self.name, key).await
    }

    /// Current keys, oldest first. Each call reflects the store as it is now.
    pub async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        self.backend.list_keys(&self.name).await
    }
}
