//! Network-first with a staleness bound, used for API calls.
//!
//! The network is always tried first. A stored copy only stands in when the
//! network fails (transport error or non-ok status) and the copy is younger
//! than the TTL.

use std::time::Duration;

use url::Url;

use swcache_core::{Error, RequestKey, Store};

use super::{Source, StrategyEngine, store_response};
use crate::fetch::NetworkResponse;

impl StrategyEngine {
    /// Serve `url` from the network, falling back to a fresh stored copy.
    pub async fn network_first(
        &self, store_name: &str, url: &Url, ttl: Duration,
    ) -> Result<(NetworkResponse, Source), Error> {
        let store = self.open_store(store_name).await;

        match self.fetcher.fetch(url).await {
            Ok(response) if response.is_ok() => {
                if let Some(store) = &store {
                    store_response(store, &response).await;
                }
                Ok((response, Source::Network))
            }
            Ok(response) => {
                // a non-ok answer is still the answer when nothing fresher is stored
                match fresh_fallback(store.as_ref(), url, ttl).await {
                    Some(cached) => Ok((cached, Source::Cache)),
                    None => Ok((response, Source::Network)),
                }
            }
            Err(err) if err.is_network() => match fresh_fallback(store.as_ref(), url, ttl).await {
                Some(cached) => Ok((cached, Source::Cache)),
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }
}

/// Stored copy of `url` if it is younger than `ttl`.
async fn fresh_fallback(store: Option<&Store>, url: &Url, ttl: Duration) -> Option<NetworkResponse> {
    let store = store?;
    let key = RequestKey::get(url.as_str());

    let entry = match store.get(&key).await {
        Ok(Some(entry)) => entry,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(store = store.name(), key = %key, error = %e, "cache read failed during fallback");
            return None;
        }
    };

    let now = chrono::Utc::now();
    if !entry.is_fresh(ttl, now) {
        tracing::debug!(
            store = store.name(),
            key = %key,
            age_secs = entry.age(now).num_seconds(),
            "stored copy past ttl, not serving"
        );
        return None;
    }

    tracing::debug!(store = store.name(), key = %key, "network failed, serving stored copy");
    Some(NetworkResponse::from_entry(url.clone(), entry))
}
