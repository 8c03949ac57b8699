//! Two-tier search result cache.
//!
//! Lookups check the process-local `moka` cache first, then the shared
//! [`KvStore`] tier when one is configured. A shared hit is copied into the
//! local tier with its original timestamp, so it never outlives the TTL
//! measured from the first write. There is no invalidation and no in-flight deduplication:
//! entries age out after the TTL and concurrent misses may all go upstream.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use localstock_core::SearchRequest;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::KvStore;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Upper bound on locally cached result sets.
const LOCAL_CAPACITY: u64 = 10_000;

/// Composite key of normalized query text, postal code and page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for `request` within a provider namespace.
    #[must_use]
    pub fn for_search(namespace: &str, request: &SearchRequest) -> Self {
        Self(format!(
            "{namespace}:search:{}|{}|{}",
            request.normalized_query(),
            request.postal_code().map_or("", |zip| zip.as_str()),
            request.page()
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared-tier envelope; validity is checked against `ts` on read.
#[derive(Serialize, Deserialize)]
struct SharedEntry<V> {
    ts: i64,
    value: V,
}

/// Result cache over values of type `V`.
#[derive(Clone)]
pub struct ResultCache<V> {
    /// Value with the millisecond timestamp of its first write
    local: Cache<String, (i64, V)>,
    shared: Option<Arc<dyn KvStore>>,
    ttl: Duration,
    _value: PhantomData<fn() -> V>,
}

impl<V> std::fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("local_entries", &self.local.entry_count())
            .field("shared", &self.shared.as_ref().map(|s| s.kind()))
            .finish()
    }
}

impl<V> ResultCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a cache, optionally backed by a shared tier.
    #[must_use]
    pub fn new(ttl: Duration, shared: Option<Arc<dyn KvStore>>) -> Self {
        let local = Cache::builder()
            .max_capacity(LOCAL_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self {
            local,
            shared,
            ttl,
            _value: PhantomData,
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, if any tier has one.
    pub async fn lookup(&self, key: &CacheKey) -> Option<V> {
        if let Some((ts, value)) = self.local.get(key.as_str()).await {
            if self.is_fresh(ts) {
                debug!(key = %key, tier = "local", "cache hit");
                return Some(value);
            }
            self.local.invalidate(key.as_str()).await;
        }

        let shared = self.shared.as_ref()?;
        let raw = match shared.get(key.as_str()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "shared cache read failed");
                return None;
            }
        };

        let entry: SharedEntry<V> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding unreadable shared cache entry");
                return None;
            }
        };

        if !self.is_fresh(entry.ts) {
            return None;
        }

        debug!(key = %key, tier = "shared", "cache hit");
        self.local
            .insert(key.as_str().to_owned(), (entry.ts, entry.value.clone()))
            .await;
        Some(entry.value)
    }

    /// Store `value` in every tier.
    pub async fn store(&self, key: &CacheKey, value: V) {
        let ts = chrono::Utc::now().timestamp_millis();
        if let Some(shared) = &self.shared {
            let entry = SharedEntry {
                ts,
                value: &value,
            };
            match serde_json::to_string(&entry) {
                Ok(raw) => {
                    if let Err(e) = shared.set(key.as_str(), &raw, self.ttl).await {
                        tracing::warn!(key = %key, error = %e, "shared cache write failed");
                    }
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "failed to encode cache entry"),
            }
        }

        self.local.insert(key.as_str().to_owned(), (ts, value)).await;
    }

    fn is_fresh(&self, ts_millis: i64) -> bool {
        let age = chrono::Utc::now().timestamp_millis().saturating_sub(ts_millis);
        u128::try_from(age).is_ok_and(|age| age < self.ttl.as_millis())
    }
}
