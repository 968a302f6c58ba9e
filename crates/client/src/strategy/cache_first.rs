//! Cache-first, used for images and (as stale-while-revalidate) for
//! everything that is neither an image nor an API call.
//!
//! A hit is served immediately and refreshed in the background. A miss is
//! fetched, stored if ok, and returned.

use std::sync::Arc;

use url::Url;

use swcache_core::{Error, RequestKey, Store};

use super::{Source, StrategyEngine, store_response};
use crate::fetch::{Fetcher, NetworkResponse};

impl StrategyEngine {
    /// Serve `url` from `store_name`, falling back to the network on a miss.
    pub async fn cache_first(&self, store_name: &str, url: &Url) -> Result<(NetworkResponse, Source), Error> {
        let key = RequestKey::get(url.as_str());
        let store = self.open_store(store_name).await;

        if let Some(store) = &store {
            match store.get(&key).await {
                Ok(Some(entry)) => {
                    tracing::debug!(store = store_name, key = %key, "cache hit");
                    self.spawn_refresh(store.clone(), url.clone());
                    return Ok((NetworkResponse::from_entry(url.clone(), entry), Source::Cache));
                }
                Ok(None) => tracing::debug!(store = store_name, key = %key, "cache miss"),
                Err(e) => tracing::warn!(store = store_name, key = %key, error = %e, "cache read failed"),
            }
        }

        let response = self.fetcher.fetch(url).await?;
        if response.is_ok()
            && let Some(store) = &store
        {
            store_response(store, &response).await;
        }

        Ok((response, Source::Network))
    }

    /// Re-fetch `url` into `store` without holding up the caller.
    fn spawn_refresh(&self, store: Store, url: Url) {
        let fetcher = Arc::clone(&self.fetcher);
        self.refreshes.spawn(refresh(fetcher, store, url));
    }
}

async fn refresh(fetcher: Arc<dyn Fetcher>, store: Store, url: Url) {
    match fetcher.fetch(&url).await {
        Ok(response) if response.is_ok() => {
            store_response(&store, &response).await;
            tracing::debug!(store = store.name(), url = %url, "background refresh stored");
        }
        Ok(response) => {
            tracing::debug!(store = store.name(), url = %url, status = response.status.as_u16(), "background refresh not ok, keeping cached entry");
        }
        Err(e) => {
            tracing::warn!(store = store.name(), url = %url, error = %e, "background refresh failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use swcache_core::{AppConfig, CacheEntry, Headers};

    use super::*;
    use crate::testing::{StubFetcher, engine_with, failing_engine};

    const PHOTO: &str = "https://cdn.example.com/photo.png";

    fn entry(url: &str, body: &'static [u8]) -> CacheEntry {
        CacheEntry {
            key: RequestKey::get(url),
            status: 200,
            headers: Headers::new(),
            body: Bytes::from_static(body),
            stored_at: chrono::Utc::now(),
        }
    }

    fn images_store() -> String {
        AppConfig::default().store_names().images
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores() {
        let fetcher = StubFetcher::new();
        fetcher.respond(PHOTO, 200, b"fresh");
        let (engine, caches) = engine_with(fetcher.clone()).await;

        let (response, source) = engine.cache_first(&images_store(), &Url::parse(PHOTO).unwrap()).await.unwrap();
        assert_eq!(source, Source::Network);
        assert_eq!(response.body, Bytes::from_static(b"fresh"));

        let store = caches.open(&images_store()).await.unwrap();
        let stored = store.get(&RequestKey::get(PHOTO)).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"fresh"));
        assert_eq!(fetcher.calls(PHOTO), 1);
    }

    #[tokio::test]
    async fn test_hit_serves_cached_and_refreshes_in_background() {
        let fetcher = StubFetcher::new();
        fetcher.respond(PHOTO, 200, b"new");
        let (engine, caches) = engine_with(fetcher.clone()).await;
        let store = caches.open(&images_store()).await.unwrap();
        store.put(&entry(PHOTO, b"old")).await.unwrap();

        let (response, source) = engine.cache_first(&images_store(), &Url::parse(PHOTO).unwrap()).await.unwrap();
        assert_eq!(source, Source::Cache);
        assert_eq!(response.body, Bytes::from_static(b"old"));

        engine.wait_for_refreshes().await;
        assert_eq!(fetcher.calls(PHOTO), 1);
        let stored = store.get(&RequestKey::get(PHOTO)).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn test_hit_does_not_wait_for_network() {
        let fetcher = StubFetcher::new();
        fetcher.hang(PHOTO);
        let (engine, caches) = engine_with(fetcher).await;
        caches.open(&images_store()).await.unwrap().put(&entry(PHOTO, b"cached")).await.unwrap();

        let served = tokio::time::timeout(
            Duration::from_secs(2),
            engine.cache_first(&images_store(), &Url::parse(PHOTO).unwrap()),
        )
        .await
        .expect("cache hit must not block on the network")
        .unwrap();

        assert_eq!(served.1, Source::Cache);
        assert_eq!(engine.pending_refreshes(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cached_entry() {
        let fetcher = StubFetcher::new();
        fetcher.respond(PHOTO, 500, b"error page");
        let (engine, caches) = engine_with(fetcher).await;
        let store = caches.open(&images_store()).await.unwrap();
        store.put(&entry(PHOTO, b"old")).await.unwrap();

        engine.cache_first(&images_store(), &Url::parse(PHOTO).unwrap()).await.unwrap();
        engine.wait_for_refreshes().await;

        let stored = store.get(&RequestKey::get(PHOTO)).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"old"));
    }

    #[tokio::test]
    async fn test_miss_with_network_failure_propagates() {
        let fetcher = StubFetcher::new();
        fetcher.fail(PHOTO);
        let (engine, caches) = engine_with(fetcher).await;

        let result = engine.cache_first(&images_store(), &Url::parse(PHOTO).unwrap()).await;
        assert!(matches!(result, Err(Error::Network(_))));

        let store = caches.open(&images_store()).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_miss_fails_and_stores_nothing() {
        let fetcher = StubFetcher::new();
        fetcher.too_large(PHOTO);
        let (engine, caches) = engine_with(fetcher).await;

        let result = engine.cache_first(&images_store(), &Url::parse(PHOTO).unwrap()).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));

        let store = caches.open(&images_store()).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_ok_response_is_returned_but_not_stored() {
        let fetcher = StubFetcher::new();
        fetcher.respond(PHOTO, 404, b"missing");
        let (engine, caches) = engine_with(fetcher).await;

        let (response, source) = engine.cache_first(&images_store(), &Url::parse(PHOTO).unwrap()).await.unwrap();
        assert_eq!(source, Source::Network);
        assert_eq!(response.status.as_u16(), 404);

        let store = caches.open(&images_store()).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_falls_back_to_network() {
        let fetcher = StubFetcher::new();
        fetcher.respond(PHOTO, 200, b"fresh");
        let engine = failing_engine(fetcher.clone());

        let (response, source) = engine.cache_first(&images_store(), &Url::parse(PHOTO).unwrap()).await.unwrap();
        assert_eq!(source, Source::Network);
        assert_eq!(response.body, Bytes::from_static(b"fresh"));
        assert_eq!(fetcher.calls(PHOTO), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_fetch_without_corruption() {
        let fetcher = StubFetcher::new();
        fetcher.respond_after(PHOTO, 200, b"photo", Duration::from_millis(50));
        let (engine, caches) = engine_with(fetcher.clone()).await;
        let url = Url::parse(PHOTO).unwrap();
        let name = images_store();

        let (first, second) = tokio::join!(engine.cache_first(&name, &url), engine.cache_first(&name, &url));

        assert_eq!(first.unwrap().0.body, Bytes::from_static(b"photo"));
        assert_eq!(second.unwrap().0.body, Bytes::from_static(b"photo"));
        assert_eq!(fetcher.calls(PHOTO), 2);

        let store = caches.open(&images_store()).await.unwrap();
        assert_eq!(store.keys().await.unwrap().len(), 1);
        let stored = store.get(&RequestKey::get(PHOTO)).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"photo"));
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_scenario() {
        let fetcher = StubFetcher::new();
        fetcher.respond("http://localhost:3000/", 200, b"<html>shell</html>");
        let (engine, caches) = engine_with(fetcher).await;
        let url = Url::parse("http://localhost:3000/").unwrap();

        let served = engine.handle(&url).await.unwrap();
        assert_eq!(served.source, Source::Network);

        let store = caches.open(&AppConfig::default().store_names().precache).await.unwrap();
        let stored = store.get(&RequestKey::get("http://localhost:3000/")).await.unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"<html>shell</html>"));

        let again = engine.handle(&url).await.unwrap();
        assert_eq!(again.source, Source::Cache);
        assert_eq!(again.response.body, served.response.body);
    }
}
