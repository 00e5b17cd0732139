//! Provider capabilities and rate limiting configuration.
//!
//! This module defines structures for describing what a market data provider
//! can do and how fast it may be called.

use std::time::Duration;

/// Describes the optional operations a market data provider offers.
///
/// Every provider can fetch a single OHLC series. The pipeline consults
/// these flags to decide whether to delegate a whole batch or fan out per
/// ticker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Whether the provider can return shareholder composition.
    pub supports_holders: bool,

    /// Whether the provider fetches many tickers in one native request.
    pub supports_batch: bool,
}

/// Steady request rate for a provider.
///
/// One request token is replenished every `period`. The burst size is not
/// part of the provider's limit; it comes from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    /// Time needed to earn one request token.
    pub period: Duration,
}

impl RateLimit {
    /// A limit of `requests` per `window`.
    ///
    /// ```
    /// use std::time::Duration;
    /// use tinkerbell_market_data::provider::RateLimit;
    ///
    /// let limit = RateLimit::per(50, Duration::from_secs(60));
    /// assert_eq!(limit.period, Duration::from_millis(1200));
    /// ```
    pub fn per(requests: u32, window: Duration) -> Self {
        Self {
            period: window / requests.max(1),
        }
    }

    /// Requests allowed per second at the steady rate.
    pub fn requests_per_second(&self) -> f64 {
        if self.period.is_zero() {
            f64::INFINITY
        } else {
            1.0 / self.period.as_secs_f64()
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per(60, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_hour() {
        let limit = RateLimit::per(2000, Duration::from_secs(3600));
        assert_eq!(limit.period, Duration::from_millis(1800));
    }

    #[test]
    fn test_per_second() {
        let limit = RateLimit::per(100, Duration::from_secs(1));
        assert_eq!(limit.period, Duration::from_millis(10));
        assert!((limit.requests_per_second() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_requests_does_not_divide_by_zero() {
        let limit = RateLimit::per(0, Duration::from_secs(1));
        assert_eq!(limit.period, Duration::from_secs(1));
    }
}
