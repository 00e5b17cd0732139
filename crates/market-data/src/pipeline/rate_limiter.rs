//! Token bucket rate limiter for the configured provider.
//!
//! The bucket starts full with `capacity` tokens (the configured burst size)
//! and earns one token per provider period. Every task issuing requests to
//! the provider shares one limiter, so token accounting is mutex guarded.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::MarketDataError;
use crate::models::ProviderId;
use crate::provider::RateLimit;

/// Token bucket state.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of available tokens.
    tokens: f64,
    /// Last time the bucket was updated.
    last_update: Instant,
    /// Token refill rate (tokens per second).
    rate: f64,
    /// Maximum bucket capacity.
    capacity: f64,
}

impl TokenBucket {
    fn new(limit: RateLimit, capacity: u32) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: limit.requests_per_second(),
            capacity,
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    /// Take a token if one is available.
    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until the next token is earned.
    fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let tokens_needed = 1.0 - self.tokens;
            Duration::from_secs_f64(tokens_needed / self.rate)
        }
    }
}

/// Token bucket rate limiter bound to one provider.
#[derive(Debug)]
pub struct RateLimiter {
    provider: ProviderId,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    /// Create a limiter with `bursts` tokens available up front.
    pub fn new(provider: impl Into<ProviderId>, limit: RateLimit, bursts: u32) -> Self {
        Self {
            provider: provider.into(),
            bucket: Mutex::new(TokenBucket::new(limit, bursts)),
        }
    }

    /// Lock the bucket, recovering from poison if necessary.
    ///
    /// The worst outcome of a poisoned bucket is slightly inaccurate
    /// pacing, which is preferable to panicking every later caller.
    fn lock_bucket(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex for '{}' was poisoned, recovering", self.provider);
            poisoned.into_inner()
        })
    }

    /// Wait for a token.
    ///
    /// Returns [`MarketDataError::Cancelled`] if `cancel` fires first, or
    /// has already fired.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), MarketDataError> {
        loop {
            if cancel.is_cancelled() {
                return Err(MarketDataError::Cancelled);
            }

            let wait_time = {
                let mut bucket = self.lock_bucket();
                if bucket.try_acquire() {
                    debug!("Rate limiter: acquired token for '{}'", self.provider);
                    return Ok(());
                }
                bucket.time_until_available()
            };

            debug!(
                "Rate limiter: waiting {:?} for provider '{}'",
                wait_time, self.provider
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Rate limiter: wait for '{}' cancelled", self.provider);
                    return Err(MarketDataError::Cancelled);
                }
                _ = tokio::time::sleep(wait_time) => {}
            }
        }
    }

    /// Try to take a token without waiting.
    pub fn try_acquire(&self) -> bool {
        self.lock_bucket().try_acquire()
    }

    /// Tokens currently available, including fractions earned so far.
    pub fn available(&self) -> f64 {
        let mut bucket = self.lock_bucket();
        bucket.refill();
        bucket.tokens
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn every(millis: u64) -> RateLimit {
        RateLimit {
            period: Duration::from_millis(millis),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_empty() {
        let limiter = RateLimiter::new("TEST", every(1000), 3);

        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refills_one_token_per_period() {
        let limiter = RateLimiter::new("TEST", every(1000), 1);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_never_exceeds_burst() {
        let limiter = RateLimiter::new("TEST", every(10), 2);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!((limiter.available() - 2.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_refill() {
        let limiter = RateLimiter::new("TEST", every(100), 2);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        limiter.acquire(&cancel).await.unwrap();
        limiter.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(1));

        limiter.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(99));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_is_cancellable() {
        let limiter = RateLimiter::new("TEST", every(3_600_000), 1);
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = limiter.acquire(&cancel).await;
        assert!(matches!(result, Err(MarketDataError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_token_fails_fast() {
        let limiter = RateLimiter::new("TEST", every(10), 5);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(limiter.acquire(&cancel).await, Err(MarketDataError::Cancelled)));
        assert!((limiter.available() - 5.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_across_tasks() {
        let limiter = Arc::new(RateLimiter::new("TEST", every(100), 1));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let cancel = cancel.clone();
                tokio::spawn(async move { limiter.acquire(&cancel).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // One token up front, three more earned at 100ms intervals
        assert!(start.elapsed() >= Duration::from_millis(299));
    }
}
