use crate::error::FetchError;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

/// Time-to-live cache keyed by feed identity.
///
/// Freshness is strict: an entry older than its TTL is never served, not even
/// as a fallback when the refresh fails. Each key has its own async slot
/// mutex, so concurrent callers for the same cold key serialize on one fetch
/// and the waiters pick up the winner's result.
#[derive(Debug, Default)]
pub struct FreshnessCache<K, V> {
    slots: StdMutex<HashMap<K, Arc<Mutex<Option<CacheEntry<V>>>>>>,
}

impl<K, V> FreshnessCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: StdMutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key` if fresh, otherwise run `fetch` and
    /// store its result. Fails only if the slot is cold or stale AND `fetch`
    /// fails; a failed refresh evicts whatever was there.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, ttl: Duration, fetch: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key).or_default().clone()
        };

        // Per-key single-flight: the slot lock is held for the whole fetch.
        let mut guard = slot.lock().await;
        if let Some(entry) = guard.as_ref() {
            if entry.is_fresh() {
                return Ok(entry.value.clone());
            }
        }

        match fetch().await {
            Ok(value) => {
                *guard = Some(CacheEntry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                    ttl,
                });
                Ok(value)
            }
            Err(err) => {
                *guard = None;
                Err(err)
            }
        }
    }
}
