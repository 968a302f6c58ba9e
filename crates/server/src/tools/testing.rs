//! Shared fixtures for tool tests.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use rmcp::model::CallToolResult;
use swcache_client::fetch::{Fetcher, NetworkResponse, StatusCode};
use swcache_client::CacheWorker;
use swcache_core::{AppConfig, CacheDb, Caches, Error};

/// Answers every URL with 200 and a body naming the path, except paths
/// containing `missing`, which get 404.
pub(crate) struct EchoFetcher;

#[async_trait::async_trait]
impl Fetcher for EchoFetcher {
    async fn fetch(&self, url: &Url) -> Result<NetworkResponse, Error> {
        let status = if url.path().contains("missing") { StatusCode::NOT_FOUND } else { StatusCode::OK };
        Ok(NetworkResponse {
            url: url.clone(),
            status,
            headers: [("content-type", "text/plain")].into_iter().collect(),
            body: Bytes::from(format!("body of {}", url.path())),
        })
    }
}

/// A worker over an in-memory database, already activated.
pub(crate) async fn started_worker() -> Arc<CacheWorker> {
    let caches = Caches::new(Arc::new(CacheDb::open_in_memory().await.unwrap()));
    let worker = CacheWorker::new(&AppConfig::default(), caches, Arc::new(EchoFetcher)).unwrap();
    worker.start().await.unwrap();
    Arc::new(worker)
}

/// Parse the JSON text of the first content block.
pub(crate) fn parse_output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
