//! Cache-aside retrieval of upstream query results.
//!
//! Lookup order per call: cache store (when present), then upstream, then
//! write-back. Store failures of any kind degrade to an upstream fetch and
//! are never returned to the caller. There is no per-key locking: concurrent
//! misses on the same key each fetch and each write, last write wins.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::client::Upstream;
use crate::errors::{CacheError, GatewayError};
use crate::keys::{CacheKey, build_key};
use crate::models::FeatureCollection;
use crate::query::QueryParams;
use crate::store::CacheStore;

/// Lifetime of every cache entry.
pub const CACHE_TTL: Duration = Duration::from_secs(30);

/// Read-through fetcher shared by all query surfaces.
#[derive(Clone)]
pub struct CachedFetcher {
    store: Option<Arc<dyn CacheStore>>,
    upstream: Arc<dyn Upstream>,
}

impl CachedFetcher {
    /// `store` may be `None`, in which case every call goes upstream.
    pub fn new(store: Option<Arc<dyn CacheStore>>, upstream: Arc<dyn Upstream>) -> Self {
        Self { store, upstream }
    }

    /// The cache store handle, if one was configured.
    #[must_use]
    pub fn store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref()
    }

    /// Return the raw (unfiltered) collection for `params`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UpstreamUnavailable`] if the cache missed and
    /// the upstream call failed.
    pub fn fetch(&self, params: &QueryParams) -> Result<FeatureCollection, GatewayError> {
        let key = build_key(params);

        if let Some(store) = &self.store {
            match lookup(store.as_ref(), &key) {
                Ok(Some(hit)) => {
                    info!("cache hit, returning cached data");
                    return Ok(hit);
                }
                Ok(None) => info!("cache miss, fetching from upstream"),
                Err(e) => warn!("cache read failed, fetching from upstream: {e}"),
            }
        }

        let data = self.upstream.fetch(params).map_err(|e| {
            error!("error fetching data: {e}");
            GatewayError::from(e)
        })?;

        if let Some(store) = &self.store {
            match write_back(store.as_ref(), &key, &data) {
                Ok(()) => info!("stored new data in cache"),
                Err(e) => warn!("cache write failed: {e}"),
            }
        }

        Ok(data)
    }
}

fn lookup(store: &dyn CacheStore, key: &CacheKey) -> Result<Option<FeatureCollection>, CacheError> {
    match store.get(key.as_str())? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

fn write_back(store: &dyn CacheStore, key: &CacheKey, data: &FeatureCollection) -> Result<(), CacheError> {
    let encoded = serde_json::to_string(data)?;
    store.set_with_ttl(key.as_str(), &encoded, CACHE_TTL)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::errors::UpstreamError;

    /// Upstream stub that counts calls and replays a fixed answer.
    pub(crate) struct StubUpstream {
        pub calls: AtomicUsize,
        pub answer: Result<FeatureCollection, u16>,
    }

    impl StubUpstream {
        pub(crate) fn ok(fc: FeatureCollection) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                answer: Ok(fc),
            }
        }

        pub(crate) fn failing(status: u16) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                answer: Err(status),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Upstream for StubUpstream {
        fn fetch(&self, _params: &QueryParams) -> Result<FeatureCollection, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Ok(fc) => Ok(fc.clone()),
                Err(status) => Err(UpstreamError::Api {
                    status: *status,
                    message: "stub failure".into(),
                }),
            }
        }
    }

    /// In-memory store that records TTLs.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub entries: Mutex<HashMap<String, (String, Duration)>>,
    }

    impl CacheStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            let entries = self.entries.lock().unwrap();
            Ok(entries.get(key).map(|(v, _)| v.clone()))
        }

        fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(key.to_string(), (value.to_string(), ttl));
            Ok(())
        }

        fn ping(&self) -> Result<(), CacheError> {
            Ok(())
        }
    }

    /// Store that fails every operation.
    pub(crate) struct DownStore;

    fn refused() -> CacheError {
        CacheError::Store(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )))
    }

    impl CacheStore for DownStore {
        fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(refused())
        }

        fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(refused())
        }

        fn ping(&self) -> Result<(), CacheError> {
            Err(refused())
        }
    }

    pub(crate) fn sample_collection() -> FeatureCollection {
        serde_json::from_value(json!({
            "type": "FeatureCollection",
            "metadata": {"count": 2},
            "features": [
                {"type": "Feature", "id": "a", "properties": {"mag": 1.5, "felt": null, "tsunami": 0}},
                {"type": "Feature", "id": "b", "properties": {"mag": 4.8, "felt": 30, "tsunami": 1}}
            ]
        }))
        .unwrap()
    }

    pub(crate) fn sample_params() -> QueryParams {
        QueryParams::from([
            ("format".to_string(), "geojson".to_string()),
            ("starttime".to_string(), "2024-01-01T00:00:00".to_string()),
            ("endtime".to_string(), "2024-01-02T00:00:00".to_string()),
        ])
    }

    #[test]
    fn test_second_call_is_served_from_cache() {
        let upstream = Arc::new(StubUpstream::ok(sample_collection()));
        let store = Arc::new(MemoryStore::default());
        let fetcher = CachedFetcher::new(Some(store.clone() as Arc<dyn CacheStore>), upstream.clone());

        let first = fetcher.fetch(&sample_params()).unwrap();
        let second = fetcher.fetch(&sample_params()).unwrap();

        assert_eq!(upstream.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(first, sample_collection());
    }

    #[test]
    fn test_write_back_uses_fixed_ttl_and_built_key() {
        let upstream = Arc::new(StubUpstream::ok(sample_collection()));
        let store = Arc::new(MemoryStore::default());
        let fetcher = CachedFetcher::new(Some(store.clone() as Arc<dyn CacheStore>), upstream);

        fetcher.fetch(&sample_params()).unwrap();

        let entries = store.entries.lock().unwrap();
        let key = build_key(&sample_params());
        let (_, ttl) = entries.get(key.as_str()).expect("entry written under built key");
        assert_eq!(*ttl, Duration::from_secs(30));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_different_params_miss_separately() {
        let upstream = Arc::new(StubUpstream::ok(sample_collection()));
        let store = Arc::new(MemoryStore::default());
        let fetcher = CachedFetcher::new(Some(store as Arc<dyn CacheStore>), upstream.clone());

        let mut other = sample_params();
        other.insert("minmagnitude".into(), "5".into());

        fetcher.fetch(&sample_params()).unwrap();
        fetcher.fetch(&other).unwrap();

        assert_eq!(upstream.calls(), 2);
    }

    #[test]
    fn test_store_down_still_returns_upstream_result() {
        let upstream = Arc::new(StubUpstream::ok(sample_collection()));
        let fetcher = CachedFetcher::new(Some(Arc::new(DownStore) as Arc<dyn CacheStore>), upstream.clone());

        for _ in 0..2 {
            let data = fetcher.fetch(&sample_params()).unwrap();
            assert_eq!(data, sample_collection());
        }
        assert_eq!(upstream.calls(), 2);
    }

    #[test]
    fn test_absent_store_always_fetches() {
        let upstream = Arc::new(StubUpstream::ok(sample_collection()));
        let fetcher = CachedFetcher::new(None, upstream.clone());

        fetcher.fetch(&sample_params()).unwrap();
        fetcher.fetch(&sample_params()).unwrap();

        assert_eq!(upstream.calls(), 2);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_and_is_overwritten() {
        let upstream = Arc::new(StubUpstream::ok(sample_collection()));
        let store = Arc::new(MemoryStore::default());
        let key = build_key(&sample_params());
        store
            .set_with_ttl(key.as_str(), "{not json", CACHE_TTL)
            .unwrap();

        let fetcher = CachedFetcher::new(Some(store.clone() as Arc<dyn CacheStore>), upstream.clone());
        let data = fetcher.fetch(&sample_params()).unwrap();

        assert_eq!(data, sample_collection());
        assert_eq!(upstream.calls(), 1);
        let rewritten = store.get(key.as_str()).unwrap().unwrap();
        assert!(serde_json::from_str::<FeatureCollection>(&rewritten).is_ok());
        assert!(fetcher.fetch(&sample_params()).is_ok());
        assert_eq!(upstream.calls(), 1);
    }

    #[test]
    fn test_upstream_failure_surfaces_and_is_not_cached() {
        let upstream = Arc::new(StubUpstream::failing(502));
        let store = Arc::new(MemoryStore::default());
        let fetcher = CachedFetcher::new(Some(store.clone() as Arc<dyn CacheStore>), upstream);

        let err = fetcher.fetch(&sample_params()).unwrap_err();
        match err {
            GatewayError::UpstreamUnavailable { cause } => assert!(cause.contains("502")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.entries.lock().unwrap().is_empty());
    }
}
