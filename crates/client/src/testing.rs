//! Test doubles shared by the client's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use url::Url;

use swcache_core::{
    AppConfig, CacheBackend, CacheDb, CacheEntry, Caches, Error, RequestKey, StoreErrorKind,
};

use crate::fetch::{Fetcher, NetworkResponse};
use crate::strategy::StrategyEngine;

#[derive(Clone)]
enum Route {
    Respond { status: u16, body: Bytes, delay: Option<Duration> },
    Fail,
    TooLarge,
    Hang,
}

/// Scripted fetcher: each URL answers with a fixed response, a network
/// error, or never. Unknown URLs fail with a network error.
#[derive(Clone, Default)]
pub(crate) struct StubFetcher {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn route(&self, url: &str, route: Route) {
        self.routes.lock().unwrap().insert(url.to_string(), route);
    }

    pub(crate) fn respond(&self, url: &str, status: u16, body: &'static [u8]) {
        self.route(url, Route::Respond { status, body: Bytes::from_static(body), delay: None });
    }

    pub(crate) fn respond_after(&self, url: &str, status: u16, body: &'static [u8], delay: Duration) {
        self.route(url, Route::Respond { status, body: Bytes::from_static(body), delay: Some(delay) });
    }

    pub(crate) fn fail(&self, url: &str) {
        self.route(url, Route::Fail);
    }

    pub(crate) fn too_large(&self, url: &str) {
        self.route(url, Route::TooLarge);
    }

    pub(crate) fn hang(&self, url: &str) {
        self.route(url, Route::Hang);
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<NetworkResponse, Error> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let route = self.routes.lock().unwrap().get(url.as_str()).cloned();

        match route {
            Some(Route::Respond { status, body, delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(NetworkResponse {
                    url: url.clone(),
                    status: StatusCode::from_u16(status).unwrap(),
                    headers: [("content-type", "text/plain")].into_iter().collect(),
                    body,
                })
            }
            Some(Route::TooLarge) => Err(Error::FetchTooLarge(format!("body of {url} exceeds limit"))),
            Some(Route::Hang) => std::future::pending().await,
            Some(Route::Fail) | None => Err(Error::Network(format!("connection refused: {url}"))),
        }
    }
}

/// Backend that wraps an in-memory database and fails selected operations.
pub(crate) struct FailingBackend {
    inner: CacheDb,
    fail_reads: bool,
    fail_next_read: AtomicBool,
    fail_writes: bool,
    fail_store_deletes: Vec<String>,
}

impl FailingBackend {
    pub(crate) async fn new() -> Self {
        Self {
            inner: CacheDb::open_in_memory().await.unwrap(),
            fail_reads: false,
            fail_next_read: AtomicBool::new(false),
            fail_writes: false,
            fail_store_deletes: Vec::new(),
        }
    }

    pub(crate) fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub(crate) fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Fail only the next read, then behave normally.
    pub(crate) fn fail_first_read(self) -> Self {
        self.fail_next_read.store(true, Ordering::SeqCst);
        self
    }

    /// Whether a one-shot read failure is still armed.
    pub(crate) fn read_failure_pending(&self) -> bool {
        self.fail_next_read.load(Ordering::SeqCst)
    }

    /// The wrapped database, bypassing injected failures.
    pub(crate) fn db(&self) -> CacheDb {
        self.inner.clone()
    }

    fn read_fails(&self) -> bool {
        self.fail_reads || self.fail_next_read.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn fail_store_delete(mut self, name: &str) -> Self {
        self.fail_store_deletes.push(name.to_string());
        self
    }
}

fn injected(kind: StoreErrorKind) -> Error {
    Error::Store { kind, message: "injected failure".to_string() }
}

#[async_trait::async_trait]
impl CacheBackend for FailingBackend {
    async fn create_store(&self, name: &str) -> Result<(), Error> {
        self.inner.create_store(name).await
    }

    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        if self.read_fails() {
            return Err(injected(StoreErrorKind::ReadFailed));
        }
        self.inner.get(store, key).await
    }

    async fn put(&self, store: &str, entry: &CacheEntry) -> Result<(), Error> {
        if self.fail_writes {
            return Err(injected(StoreErrorKind::QuotaExceeded));
        }
        self.inner.put(store, entry).await
    }

    async fn delete(&self, store: &str, key: &RequestKey) -> Result<bool, Error> {
        if self.fail_writes {
            return Err(injected(StoreErrorKind::WriteFailed));
        }
        self.inner.delete(store, key).await
    }

    async fn list_keys(&self, store: &str) -> Result<Vec<RequestKey>, Error> {
        if self.read_fails() {
            return Err(injected(StoreErrorKind::ReadFailed));
        }
        self.inner.list_keys(store).await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        if self.fail_store_deletes.iter().any(|n| n == name) {
            return Err(injected(StoreErrorKind::WriteFailed));
        }
        self.inner.delete_store(name).await
    }

    async fn list_store_names(&self) -> Result<Vec<String>, Error> {
        if self.read_fails() {
            return Err(injected(StoreErrorKind::ReadFailed));
        }
        self.inner.list_store_names().await
    }
}

pub(crate) async fn memory_caches() -> Caches {
    Caches::new(Arc::new(CacheDb::open_in_memory().await.unwrap()))
}

/// Engine with default configuration over a fresh in-memory database.
pub(crate) async fn engine_with(fetcher: StubFetcher) -> (StrategyEngine, Caches) {
    let caches = memory_caches().await;
    let engine = StrategyEngine::from_config(&AppConfig::default(), caches.clone(), Arc::new(fetcher));
    (engine, caches)
}

/// Engine whose every store operation fails.
pub(crate) fn failing_engine(fetcher: StubFetcher) -> StrategyEngine {
    StrategyEngine::from_config(&AppConfig::default(), Caches::new(Arc::new(AlwaysFailing)), Arc::new(fetcher))
}

/// Engine whose stores open and read normally but reject every write.
pub(crate) async fn write_failing_engine(fetcher: StubFetcher) -> (StrategyEngine, Caches) {
    let caches = Caches::new(Arc::new(FailingBackend::new().await.fail_writes()));
    let engine = StrategyEngine::from_config(&AppConfig::default(), caches.clone(), Arc::new(fetcher));
    (engine, caches)
}

/// Backend with no storage at all; every call fails.
pub(crate) struct AlwaysFailing;

#[async_trait::async_trait]
impl CacheBackend for AlwaysFailing {
    async fn create_store(&self, _name: &str) -> Result<(), Error> {
        Err(injected(StoreErrorKind::WriteFailed))
    }

    async fn get(&self, _store: &str, _key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        Err(injected(StoreErrorKind::ReadFailed))
    }

    async fn put(&self, _store: &str, _entry: &CacheEntry) -> Result<(), Error> {
        Err(injected(StoreErrorKind::QuotaExceeded))
    }

    async fn delete(&self, _store: &str, _key: &RequestKey) -> Result<bool, Error> {
        Err(injected(StoreErrorKind::WriteFailed))
    }

    async fn list_keys(&self, _store: &str) -> Result<Vec<RequestKey>, Error> {
        Err(injected(StoreErrorKind::ReadFailed))
    }

    async fn delete_store(&self, _name: &str) -> Result<bool, Error> {
        Err(injected(StoreErrorKind::WriteFailed))
    }

    async fn list_store_names(&self) -> Result<Vec<String>, Error> {
        Err(injected(StoreErrorKind::ReadFailed))
    }
}
