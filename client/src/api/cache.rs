use super::{ListApi, MutationMethod};
use crate::session::Session;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use shared::dto::common::MutationResponse;
use shared::error::Result;
use shared::query::ListQuery;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// A cached body and the instant it stops being served.
#[derive(Clone)]
pub struct CacheEntry<T: Clone> {
    data: T,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// List response bodies keyed by `<path>?<query string>`.
#[derive(Clone)]
pub struct RequestCache {
    cache: Arc<Mutex<HashMap<String, CacheEntry<String>>>>,
    ttl: Duration,
}

impl RequestCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<String>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets a cached body or fetches and stores it. Failures are not cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetcher: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(data) = self.get(key) {
            debug!("Cache hit for key: {}", key);
            return Ok(data);
        }

        debug!("Cache miss for key: {}, fetching...", key);
        let result = fetcher().await?;
        self.set(key.to_string(), result.clone());
        Ok(result)
    }

    /// Live value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries()
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.data.clone())
    }

    /// Stores `value` and drops entries whose TTL has passed, so keys that
    /// are never asked for again do not pile up.
    pub fn set(&self, key: String, value: String) {
        let entry = CacheEntry::new(value, self.ttl);
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        if entries.len() < before {
            debug!("Purged {} expired cache entries", before - entries.len());
        }
        entries.insert(key, entry);
    }

    /// Drops every entry whose path is `path` or a parent of it, so a
    /// mutation on `/api/admin/tickets/42` clears the ticket list pages.
    pub fn invalidate_path(&self, path: &str) {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| {
            let key_path = key.split('?').next().unwrap_or(key);
            !(path.starts_with(key_path) || key_path.starts_with(path))
        });
        debug!("Invalidated {} cache entries for {}", before - entries.len(), path);
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries();
        let total_entries = entries.len();
        let expired_entries = entries.values().filter(|entry| entry.is_expired()).count();

        CacheStats {
            total_entries,
            valid_entries: total_entries - expired_entries,
            expired_entries,
        }
    }
}

/// Entry counts reported by `RequestCache::stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

/// Wraps another `ListApi`, serving repeated list queries from a
/// [`RequestCache`]. Exports are never cached; mutations invalidate.
#[derive(Clone)]
pub struct CachedApi<A> {
    inner: A,
    cache: RequestCache,
}

impl<A: ListApi> CachedApi<A> {
    pub fn new(inner: A, ttl: Duration) -> Self {
        Self {
            inner,
            cache: RequestCache::new(ttl),
        }
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A: ListApi> ListApi for CachedApi<A> {
    async fn get_list(&self, session: &Session, path: &str, query: &ListQuery) -> Result<String> {
        let key = query.apply_to(path);
        self.cache
            .get_or_fetch(&key, || self.inner.get_list(session, path, query))
            .await
    }

    async fn export(&self, session: &Session, path: &str, query: &ListQuery) -> Result<Vec<u8>> {
        self.inner.export(session, path, query).await
    }

    async fn mutate(
        &self,
        session: &Session,
        method: MutationMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<MutationResponse> {
        let result = self.inner.mutate(session, method, path, body).await;
        // Even a failed mutation may have changed something server-side.
        self.cache.invalidate_path(path);
        result
    }

    fn invalidate(&self, path: &str) {
        self.cache.invalidate_path(path);
        self.inner.invalidate(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared::filter::FilterState;
    use shared::query::build_query;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingApi {
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl ListApi for CountingApi {
        async fn get_list(&self, _: &Session, path: &str, query: &ListQuery) -> Result<String> {
            let n = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{}#{}", query.apply_to(path), n))
        }

        async fn export(&self, _: &Session, _: &str, _: &ListQuery) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn mutate(
            &self,
            _: &Session,
            _: MutationMethod,
            _: &str,
            _: Option<Value>,
        ) -> Result<MutationResponse> {
            Ok(MutationResponse::ok())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_query_is_served_from_cache_until_expiry() {
        let api = CachedApi::new(CountingApi::default(), Duration::from_secs(60));
        let session = Session::new();
        let query = build_query(&FilterState::new().with_text("customer", "ava"), None, 1, 25);

        let first = api.get_list(&session, "/api/admin/tickets", &query).await.unwrap();
        let second = api.get_list(&session, "/api/admin/tickets", &query).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(api.inner().list_calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(api.cache().stats().expired_entries, 1);
        let third = api.get_list(&session, "/api/admin/tickets", &query).await.unwrap();
        assert_ne!(first, third);
        assert_eq!(api.inner().list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_purged_as_new_queries_arrive() {
        let api = CachedApi::new(CountingApi::default(), Duration::from_secs(30));
        let session = Session::new();

        for customer in ["a", "av", "ava"] {
            let query = build_query(&FilterState::new().with_text("customer", customer), None, 1, 25);
            api.get_list(&session, "/api/admin/tickets", &query).await.unwrap();
        }
        assert_eq!(api.cache().stats().total_entries, 3);

        tokio::time::advance(Duration::from_secs(31)).await;
        let query = build_query(&FilterState::new().with_text("customer", "ben"), None, 1, 25);
        api.get_list(&session, "/api/admin/tickets", &query).await.unwrap();

        assert_eq!(
            api.cache().stats(),
            CacheStats { total_entries: 1, valid_entries: 1, expired_entries: 0 }
        );
    }

    #[tokio::test]
    async fn test_mutation_invalidates_parent_list() {
        let api = CachedApi::new(CountingApi::default(), Duration::from_secs(60));
        let session = Session::new();
        let query = build_query(&FilterState::new(), None, 1, 25);

        api.get_list(&session, "/api/admin/tickets", &query).await.unwrap();
        api.get_list(&session, "/api/admin/teams", &query).await.unwrap();
        assert_eq!(api.cache().stats().valid_entries, 2);

        api.mutate(&session, MutationMethod::Delete, "/api/admin/tickets/t1", None)
            .await
            .unwrap();

        let stats = api.cache().stats();
        assert_eq!(stats.total_entries, 1);
        api.get_list(&session, "/api/admin/teams", &query).await.unwrap();
        assert_eq!(api.inner().list_calls.load(Ordering::SeqCst), 2);
    }
}
