//! cache_fetch tool implementation.
//!
//! Sends a GET through the worker, exactly as an intercepted page request
//! would be handled.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{CacheWorker, Served};
use swcache_core::Error;

use super::json_result;

/// Input parameters for the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchParams {
    /// Absolute URL, or a path relative to the configured origin.
    pub url: String,
}

/// Output structure for the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchOutput {
    /// The resolved URL.
    pub url: String,
    /// Traffic class: "image", "api" or "other".
    pub class: String,
    /// Where the response came from: "network" or "cache".
    pub source: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers (lowercased names).
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

impl From<Served> for CacheFetchOutput {
    fn from(served: Served) -> Self {
        let response = served.response;
        Self {
            url: response.url.to_string(),
            class: served.class.as_str().to_string(),
            source: served.source.as_str().to_string(),
            status: response.status.as_u16(),
            headers: response.headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }
    }
}

/// Implementation of the cache_fetch tool.
pub async fn fetch_impl(worker: &CacheWorker, params: CacheFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url must not be empty".to_string()).into());
    }

    let served = worker.fetch(&params.url).await?;
    tracing::info!(url = %served.response.url, class = %served.class, source = served.source.as_str(), "cache_fetch served");

    json_result(&CacheFetchOutput::from(served))
}
