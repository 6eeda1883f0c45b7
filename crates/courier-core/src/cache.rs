//! Cache of session-scoped identifiers discovered through side API calls.
//!
//! QQ guild DMs are addressed by `(recipient_id, source_guild_id)`, but the
//! send API wants the DM's own guild id, which only a `post_dms` call
//! reveals. The first send to a pair resolves it; later sends reuse it.
//!
//! The cache is a pure optimisation: a missing entry only costs one extra
//! resolving call. Entries are never invalidated proactively; a stale value
//! the platform rejects surfaces as the send's transport failure.
//!
//! Concurrent misses on the same key are coalesced: each key owns a
//! [`OnceCell`] acting as the in-flight marker, so only one resolving call
//! runs per key while unrelated keys resolve in parallel. The map lock only
//! guards the insertion of that cell and is never held across a call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

/// Composite cache key: `(recipient_id, source_guild_id)`.
pub type DirectChannelKey = (u64, u64);

/// Process-wide store of resolved direct-channel identifiers.
#[derive(Default)]
pub struct IdentifierCache {
    entries: Mutex<HashMap<DirectChannelKey, Arc<OnceCell<String>>>>,
}

impl IdentifierCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resolved identifier for `key`, if one is cached.
    pub fn get(&self, key: DirectChannelKey) -> Option<String> {
        self.entries
            .lock()
            .get(&key)
            .and_then(|cell| cell.get().cloned())
    }

    /// Returns the cached identifier for `key`, running `resolve` on a miss.
    ///
    /// If several callers miss on the same key at once, only one of them runs
    /// its resolver; the rest wait for and share its result. A failed
    /// resolution stores nothing, so the next caller resolves again. Dropping
    /// the resolving future hands the resolution to the next waiter.
    pub async fn get_or_resolve<F, Fut, E>(&self, key: DirectChannelKey, resolve: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let cell = self.cell(key);

        if let Some(value) = cell.get() {
            trace!(recipient_id = key.0, source_guild_id = key.1, "Direct channel cache hit");
            return Ok(value.clone());
        }

        let value = cell
            .get_or_try_init(|| async {
                debug!(
                    recipient_id = key.0,
                    source_guild_id = key.1,
                    "Resolving direct channel"
                );
                resolve().await
            })
            .await?;

        Ok(value.clone())
    }

    /// Seeds the cache with a known identifier.
    ///
    /// Returns false if `key` already held a value, which is kept.
    pub fn insert(&self, key: DirectChannelKey, value: impl Into<String>) -> bool {
        self.cell(key).set(value.into()).is_ok()
    }

    /// Returns the number of resolved entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    /// Returns true if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, key: DirectChannelKey) -> Arc<OnceCell<String>> {
        Arc::clone(self.entries.lock().entry(key).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_second_lookup_skips_resolver() {
        let cache = IdentifierCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_resolve((1111, 2222), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>("3333".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "3333");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get((1111, 2222)).as_deref(), Some("3333"));
    }

    #[tokio::test]
    async fn test_distinct_keys_resolve_separately() {
        let cache = IdentifierCache::new();
        let calls = AtomicUsize::new(0);

        for key in [(1, 2), (1, 3)] {
            cache
                .get_or_resolve(key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(format!("{}-{}", key.0, key.1))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce() {
        let cache = Arc::new(IdentifierCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let lookups = (0..8).map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_resolve((7, 8), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, ()>("resolved".to_string())
                    })
                    .await
            })
        });

        for result in futures::future::join_all(lookups).await {
            assert_eq!(result.unwrap().unwrap(), "resolved");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_resolution_is_not_cached() {
        let cache = IdentifierCache::new();

        let err = cache
            .get_or_resolve((1, 1), || async { Err::<String, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());

        let value = cache
            .get_or_resolve((1, 1), || async { Ok::<_, &str>("ok".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "ok");
    }

    #[test]
    fn test_insert_keeps_first_value() {
        let cache = IdentifierCache::new();
        assert!(cache.insert((1, 2), "a"));
        assert!(!cache.insert((1, 2), "b"));
        assert_eq!(cache.get((1, 2)).as_deref(), Some("a"));
    }
}
