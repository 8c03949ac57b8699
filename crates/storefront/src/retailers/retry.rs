//! Bounded retry with exponential backoff for a single outbound call.
//!
//! This is the only place backoff timing lives; adapters never retry on
//! their own.
//!
//! # Policy
//!
//! | Outcome | Action | Backoff (base, cap) | Jitter |
//! |---------|--------|---------------------|--------|
//! | 2xx | return | - | - |
//! | 403 (retailer rate-limit signal) | retry | 1000ms, 5000ms | 0-200ms |
//! | 5xx | retry | 500ms, 3000ms | none |
//! | transport error | retry | 200ms, 2000ms | none |
//! | any other status | return, caller decides | - | - |
//!
//! The delay for attempt `n` (0-based) is `min(base * 2^n, cap)`. After
//! `max_attempts` unsuccessful attempts the call fails with
//! [`RetailerError::UpstreamExhausted`].

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;

use super::RetailerError;
use super::transport::{HttpTransport, OutboundRequest, TransportResponse};

/// Exponential backoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
    /// Upper bound (exclusive) of the random jitter added to each delay.
    pub max_jitter: Duration,
}

impl Backoff {
    #[must_use]
    pub const fn new(base_ms: u64, cap_ms: u64) -> Self {
        Self {
            base: Duration::from_millis(base_ms),
            cap: Duration::from_millis(cap_ms),
            max_jitter: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn with_jitter(mut self, max_jitter_ms: u64) -> Self {
        self.max_jitter = Duration::from_millis(max_jitter_ms);
        self
    }

    /// Delay before retrying after the 0-based `attempt`, without jitter.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
            Duration::from_millis(rand::rng().random_range(0..max))
        };
        self.delay(attempt) + jitter
    }
}

/// Retry policy per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limited: Backoff,
    pub server_error: Backoff,
    pub transport: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            rate_limited: Backoff::new(1000, 5000).with_jitter(200),
            server_error: Backoff::new(500, 3000),
            transport: Backoff::new(200, 2000),
        }
    }
}

/// What happened on one attempt, and whether to go again.
enum Outcome {
    Done(TransportResponse),
    Retry { backoff: Backoff, last_error: String },
}

impl RetryPolicy {
    fn classify(
        &self,
        result: Result<TransportResponse, super::transport::TransportError>,
    ) -> Outcome {
        match result {
            Ok(response) if response.status.is_success() => Outcome::Done(response),
            Ok(response) if response.status == StatusCode::FORBIDDEN => Outcome::Retry {
                backoff: self.rate_limited,
                last_error: format!("403: {}", response.body_excerpt(200)),
            },
            Ok(response) if response.status.is_server_error() => Outcome::Retry {
                backoff: self.server_error,
                last_error: format!("{}: {}", response.status.as_u16(), response.body_excerpt(200)),
            },
            Ok(response) => Outcome::Done(response),
            Err(e) => Outcome::Retry {
                backoff: self.transport,
                last_error: e.to_string(),
            },
        }
    }
}

/// Executes outbound calls through a transport with the retry policy applied.
#[derive(Clone)]
pub struct RetryExecutor {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl RetryExecutor {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// The underlying transport, for single-attempt calls.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Execute `request`, retrying per policy.
    ///
    /// Returns the first 2xx response, or the first response whose status is
    /// neither 403 nor 5xx (the caller decides what that means).
    ///
    /// # Errors
    ///
    /// Returns [`RetailerError::UpstreamExhausted`] carrying the last observed
    /// status or transport error once `max_attempts` have failed.
    pub async fn execute(
        &self,
        request: &OutboundRequest,
    ) -> Result<TransportResponse, RetailerError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            let result = self.transport.send(request.clone()).await;

            match self.policy.classify(result) {
                Outcome::Done(response) => return Ok(response),
                Outcome::Retry {
                    backoff,
                    last_error: error,
                } => {
                    last_error = error;
                    if attempt + 1 < max_attempts {
                        let delay = backoff.jittered_delay(attempt);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %last_error,
                            "retailer call failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::error!(attempts = max_attempts, error = %last_error, "retailer call exhausted retries");
        Err(RetailerError::UpstreamExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}
