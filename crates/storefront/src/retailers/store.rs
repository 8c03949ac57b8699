//! Shared key-value store used by the result cache and the rate limiter.
//!
//! Two implementations share one interface and are selected once at startup:
//!
//! - [`RedisStore`] when `REDIS_URL` is configured (multi-instance deployments)
//! - [`MemoryStore`] otherwise (single process, same semantics)
//!
//! Callers never know which one is active.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::time::Instant;

/// Errors from the shared store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing service could not be reached or rejected the command.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value had an unexpected shape.
    #[error("invalid stored value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Minimal Redis-shaped interface: string values with optional expiry and
/// atomic counters.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Short name for logs (`"memory"`, `"redis"`).
    fn kind(&self) -> &'static str;

    /// Get a value. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically increment a counter, creating it at 1 when absent.
    ///
    /// Returns the post-increment value. No two callers can observe the
    /// same value for the same key.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Set the expiry of an existing key. Missing keys are ignored.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Check connectivity.
    async fn ping(&self) -> Result<(), StoreError>;
}

// =============================================================================
// In-process store
// =============================================================================

#[derive(Debug)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process store with the same surface as the Redis-backed one.
///
/// Expired entries are dropped lazily on access and swept on writes once
/// the map grows past a threshold.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

/// Sweep expired entries once the map holds this many keys.
const SWEEP_THRESHOLD: usize = 4096;

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the map, recovering from poison.
    ///
    /// A poisoned lock only means a panic happened mid-update of plain
    /// strings; the map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("memory store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn sweep(slots: &mut HashMap<String, Slot>, now: Instant) {
        if slots.len() >= SWEEP_THRESHOLD {
            slots.retain(|_, slot| slot.is_live(now));
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut slots = self.lock();
        match slots.get(key) {
            Some(slot) if slot.is_live(now) => Ok(Some(slot.value.clone())),
            Some(_) => {
                slots.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut slots = self.lock();
        Self::sweep(&mut slots, now);
        slots.insert(
            key.to_owned(),
            Slot {
                value: value.to_owned(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut slots = self.lock();
        Self::sweep(&mut slots, now);

        let current = match slots.get(key) {
            Some(slot) if slot.is_live(now) => {
                slot.value
                    .parse::<i64>()
                    .map_err(|e| StoreError::InvalidValue {
                        key: key.to_owned(),
                        message: e.to_string(),
                    })?
            }
            _ => {
                slots.remove(key);
                0
            }
        };

        let next = current + 1;
        let expires_at = slots.get(key).and_then(|slot| slot.expires_at);
        slots.insert(
            key.to_owned(),
            Slot {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        if let Some(slot) = self.lock().get_mut(key)
            && slot.is_live(now)
        {
            slot.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// =============================================================================
// Redis-backed store
// =============================================================================

/// Store backed by a shared Redis instance.
///
/// Uses a multiplexed [`ConnectionManager`], which reconnects on its own.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

/// Clamp a duration to whole milliseconds, at least 1.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KvStore for RedisStore {
    fn kind(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        Ok(redis::cmd("INCR")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

/// Pick the shared store: Redis when a URL is configured and reachable,
/// otherwise the in-process store.
pub async fn connect_store(redis_url: Option<&str>) -> Arc<dyn KvStore> {
    let Some(url) = redis_url else {
        tracing::info!("REDIS_URL not set, using in-process store");
        return Arc::new(MemoryStore::new());
    };

    match RedisStore::connect(url).await {
        Ok(store) => {
            tracing::info!("connected to shared Redis store");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unreachable, falling back to in-process store");
            Arc::new(MemoryStore::new())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_get_expires() {
        let store = MemoryStore::new();
        store.set("k", "v", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_counts_and_keeps_expiry() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("c").await.unwrap(), 1);
        store.expire("c", Duration::from_secs(2)).await.unwrap();
        assert_eq!(store.incr("c").await.unwrap(), 2);
        assert_eq!(store.incr("c").await.unwrap(), 3);

        tokio::time::advance(Duration::from_secs(3)).await;
        // Expired counter restarts
        assert_eq!(store.incr("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_rejects_non_numeric() {
        let store = MemoryStore::new();
        store.set("k", "abc", Duration::from_secs(5)).await.unwrap();
        assert!(matches!(
            store.incr("k").await,
            Err(StoreError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_expire_missing_key_is_noop() {
        let store = MemoryStore::new();
        store.expire("missing", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_incr_is_unique() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.incr("n").await.unwrap() })
            })
            .collect();

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_connect_store_without_url_is_memory() {
        let store = connect_store(None).await;
        assert_eq!(store.kind(), "memory");
        assert!(store.ping().await.is_ok());
    }
}
