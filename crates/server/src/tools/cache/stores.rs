//! cache_stores tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::CacheWorker;

use crate::tools::json_result;

/// Parameters for the cache_stores tool (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: usize,
    /// Whether the store belongs to the current version tag.
    pub current: bool,
}

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresOutput {
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_stores tool.
pub async fn stores_impl(worker: &CacheWorker, _params: CacheStoresParams) -> Result<CallToolResult, McpError> {
    let mut stores = Vec::new();
    for name in worker.caches().names().await? {
        let entries = worker.caches().open(&name).await?.keys().await?.len();
        let current = worker.store_names().contains(&name);
        stores.push(StoreSummary { name, entries, current });
    }

    json_result(&CacheStoresOutput { stores })
}
