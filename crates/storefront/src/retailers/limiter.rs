//! Per-provider outbound rate limiter.
//!
//! A fixed-window counter per `(provider, unix second)` held in the shared
//! [`KvStore`], so every instance pointed at the same store shares one budget.
//! When the store fails the limiter degrades to a no-op and calls proceed.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use super::RetailerError;
use super::store::KvStore;

/// Bucket keys outlive their second to cover clock skew between instances.
const BUCKET_TTL: Duration = Duration::from_secs(2);

/// Re-check interval while over the limit (plus jitter).
const TICK_MS: u64 = 100;
const TICK_JITTER_MS: u64 = 50;

/// Wall-clock seconds derived from the runtime's monotonic clock.
///
/// Anchored to the wall clock once, then advanced by [`tokio::time::Instant`],
/// so paused-time tests move the window forward.
#[derive(Debug, Clone, Copy)]
pub struct WindowClock {
    origin_unix_ms: i64,
    origin: Instant,
}

impl WindowClock {
    /// Anchor at the current wall-clock time.
    #[must_use]
    pub fn system() -> Self {
        Self::starting_at(chrono::Utc::now().timestamp_millis())
    }

    /// Anchor at a fixed unix timestamp in milliseconds.
    #[must_use]
    pub fn starting_at(unix_ms: i64) -> Self {
        Self {
            origin_unix_ms: unix_ms,
            origin: Instant::now(),
        }
    }

    /// Current unix second.
    #[must_use]
    pub fn unix_second(&self) -> i64 {
        let elapsed = i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.origin_unix_ms.saturating_add(elapsed) / 1000
    }
}

/// A granted slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Counted against the window for `second`.
    Granted { second: i64, count: i64 },
    /// The store was unavailable; not counted.
    Unmetered,
}

/// Caps calls to one provider at `limit` per second.
#[derive(Clone)]
pub struct RateLimiter {
    store: Option<Arc<dyn KvStore>>,
    provider: &'static str,
    limit: u32,
    max_wait: Duration,
    clock: WindowClock,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("provider", &self.provider)
            .field("limit", &self.limit)
            .field("max_wait", &self.max_wait)
            .field("store", &self.store.as_ref().map(|s| s.kind()))
            .finish()
    }
}

impl RateLimiter {
    /// Default ceiling on the total time spent waiting for a slot.
    pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(3000);

    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, provider: &'static str, limit: u32) -> Self {
        Self {
            store: Some(store),
            provider,
            limit: limit.max(1),
            max_wait: Self::DEFAULT_MAX_WAIT,
            clock: WindowClock::system(),
        }
    }

    /// A limiter that admits everything.
    #[must_use]
    pub fn disabled(provider: &'static str) -> Self {
        Self {
            store: None,
            provider,
            limit: u32::MAX,
            max_wait: Duration::ZERO,
            clock: WindowClock::system(),
        }
    }

    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: WindowClock) -> Self {
        self.clock = clock;
        self
    }

    fn bucket_key(&self, second: i64) -> String {
        format!("ratelimit:{}:{second}", self.provider)
    }

    /// Wait for a slot in the current one-second window.
    ///
    /// # Errors
    ///
    /// Returns [`RetailerError::RateLimitExceeded`] when no slot frees up
    /// within the wait ceiling.
    pub async fn acquire(&self) -> Result<Admission, RetailerError> {
        let Some(store) = &self.store else {
            return Ok(Admission::Unmetered);
        };

        let started = Instant::now();
        loop {
            let second = self.clock.unix_second();
            let key = self.bucket_key(second);

            let count = match store.incr(&key).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(provider = self.provider, error = %e, "rate limiter store unavailable, not limiting");
                    return Ok(Admission::Unmetered);
                }
            };

            if count == 1
                && let Err(e) = store.expire(&key, BUCKET_TTL).await
            {
                tracing::warn!(provider = self.provider, error = %e, "failed to set rate bucket expiry");
            }

            if count <= i64::from(self.limit) {
                return Ok(Admission::Granted { second, count });
            }

            if started.elapsed() >= self.max_wait {
                tracing::warn!(
                    provider = self.provider,
                    limit = self.limit,
                    "rate limit wait ceiling reached"
                );
                return Err(RetailerError::RateLimitExceeded {
                    provider: self.provider,
                });
            }

            let tick = Duration::from_millis(TICK_MS + rand::rng().random_range(0..TICK_JITTER_MS));
            let remaining = self.max_wait.saturating_sub(started.elapsed());
            tokio::time::sleep(tick.min(remaining)).await;
        }
    }
}
