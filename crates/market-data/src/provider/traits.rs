//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that every
//! upstream source adapter implements.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::MarketDataError;
use crate::models::{Chart, Holders, Interval, OhlcPoint, Ticker, TimeWindow};

use super::capabilities::{ProviderCapabilities, RateLimit};

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source. The
/// acquisition pipeline owns rate limiting and cancellation; adapters only
/// translate requests and payloads.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tinkerbell_market_data::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities::default()
///     }
///
///     fn rate_limit(&self) -> RateLimit {
///         RateLimit::default()
///     }
///
///     // ... implement get_ohlc
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// A constant string like "YAHOO" or "IEX", used in logs and errors.
    fn id(&self) -> &'static str;

    /// Describes which optional operations this provider offers.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Steady request rate the pipeline should enforce.
    fn rate_limit(&self) -> RateLimit;

    /// Fetch one OHLC series.
    ///
    /// # Arguments
    ///
    /// * `ticker` - The ticker symbol as the provider knows it
    /// * `interval` - Already validated interval
    /// * `window` - Inclusive time window; points outside it are dropped
    ///
    /// # Returns
    ///
    /// The points in upstream order, or a `MarketDataError` on failure.
    async fn get_ohlc(
        &self,
        ticker: &str,
        interval: Interval,
        window: &TimeWindow,
    ) -> Result<Vec<OhlcPoint>, MarketDataError>;

    /// Fetch shareholder composition.
    ///
    /// Default implementation returns `NotSupported`.
    async fn get_holders(&self, ticker: &str) -> Result<Holders, MarketDataError> {
        let _ = ticker;
        Err(MarketDataError::not_supported("holders", self.id()))
    }

    /// Fetch many series with the provider's own batching.
    ///
    /// Each decoded series is sent to `sink` as soon as it is available.
    /// Failures of part of the batch are logged and skipped; an `Err` is
    /// returned only when nothing could be attempted at all.
    ///
    /// # Returns
    ///
    /// The number of series delivered to `sink`.
    /// Default implementation returns `NotSupported`.
    async fn get_ohlc_batch(
        &self,
        tickers: &[Ticker],
        interval: Interval,
        window: &TimeWindow,
        sink: mpsc::Sender<Chart>,
    ) -> Result<usize, MarketDataError> {
        let _ = (tickers, interval, window, sink);
        Err(MarketDataError::not_supported("batch", self.id()))
    }
}
