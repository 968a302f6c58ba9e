//! cache_get tool implementation.
//!
//! Looks up a stored entry by store name and URL without touching the
//! network.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::CacheWorker;
use swcache_core::{CacheEntry, Error, RequestKey};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Store name, e.g. "estate-images-v1".
    pub store: String,
    /// Absolute URL, or a path relative to the configured origin.
    pub url: String,
}

/// A stored entry as returned by cache_get.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoredEntry {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// RFC 3339 time the entry was written.
    pub stored_at: String,
    pub age_secs: i64,
    pub body: String,
}

impl From<CacheEntry> for StoredEntry {
    fn from(entry: CacheEntry) -> Self {
        Self {
            status: entry.status,
            headers: entry.headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            stored_at: entry.stored_at.to_rfc3339(),
            age_secs: entry.age(chrono::Utc::now()).num_seconds(),
            body: String::from_utf8_lossy(&entry.body).into_owned(),
        }
    }
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub url: String,
    /// The entry, or null on a miss.
    pub entry: Option<StoredEntry>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &CacheWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = worker.resolve(&params.url)?;

    // opening would create the store, so check it exists first
    let names = worker.caches().names().await?;
    if !names.contains(&params.store) {
        return Err(Error::InvalidInput(format!("unknown store: {}", params.store)).into());
    }

    let store = worker.caches().open(&params.store).await?;
    let entry = store.get(&RequestKey::get(url.as_str())).await?;

    let output = CacheGetOutput { store: params.store, url: url.to_string(), entry: entry.map(StoredEntry::from) };
    json_result(&output)
}
