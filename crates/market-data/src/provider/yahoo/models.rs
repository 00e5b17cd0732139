//! Yahoo Finance chart API response models.
//!
//! The chart endpoint returns a flat timestamp array with parallel price
//! and volume arrays. Any element of those arrays may be `null` when the
//! exchange reported no trade for that bucket.

use serde::Deserialize;

/// Main response wrapper for the chart API
#[derive(Debug, Deserialize)]
pub struct YahooChartResponse {
    pub chart: YahooChart,
}

/// Chart container
#[derive(Debug, Deserialize)]
pub struct YahooChart {
    #[serde(default)]
    pub result: Option<Vec<YahooChartResult>>,
    // Note: error field exists in API but we handle errors via HTTP status/empty results
}

/// One series from the chart API
#[derive(Debug, Deserialize)]
pub struct YahooChartResult {
    pub meta: YahooChartMeta,
    /// Unix timestamps in seconds; absent when there is no data
    #[serde(default, rename = "timestamp")]
    pub timestamps: Vec<i64>,
    pub indicators: YahooIndicators,
}

/// Series metadata
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooChartMeta {
    /// IANA name such as "America/New_York"
    #[serde(default)]
    pub exchange_timezone_name: String,
    // Note: currency, symbol and trading periods exist but are not used
}

/// Indicator groups
#[derive(Debug, Deserialize)]
pub struct YahooIndicators {
    #[serde(default)]
    pub quote: Vec<YahooQuoteArrays>,
}

/// Parallel OHLCV arrays, index-aligned with the timestamps
#[derive(Debug, Default, Deserialize)]
pub struct YahooQuoteArrays {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<i64>>,
}

/// One fully populated bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YahooBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl YahooQuoteArrays {
    /// The bucket at `index`, or `None` if any field is null or missing.
    pub fn bar(&self, index: usize) -> Option<YahooBar> {
        Some(YahooBar {
            open: self.open.get(index).copied().flatten()?,
            high: self.high.get(index).copied().flatten()?,
            low: self.low.get(index).copied().flatten()?,
            close: self.close.get(index).copied().flatten()?,
            volume: self.volume.get(index).copied().flatten()?,
        })
    }
}
