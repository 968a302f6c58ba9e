//! cache_sweep tool implementation.
//!
//! Runs one eviction sweep immediately instead of waiting for the timer.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::CacheWorker;

use crate::tools::json_result;

/// Parameters for the cache_sweep tool (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepParams {}

/// Output from the cache_sweep tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSweepOutput {
    /// Store that was swept.
    pub store: String,
    /// Number of entries deleted.
    pub deleted: usize,
    /// Entries kept at most.
    pub capacity: usize,
}

/// Implementation of the cache_sweep tool.
pub async fn sweep_impl(worker: &CacheWorker, _params: CacheSweepParams) -> Result<CallToolResult, McpError> {
    let sweeper = worker.sweeper();
    let deleted = sweeper.sweep().await?;

    let output = CacheSweepOutput { store: sweeper.store_name().to_string(), deleted, capacity: sweeper.capacity() };
    json_result(&output)
}
