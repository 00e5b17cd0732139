//! CoinGecko market data provider.
//!
//! Fetches OHLC candles for a coin id (e.g. "bitcoin") from
//! `/api/v3/coins/{id}/ohlc`, priced in USD. The endpoint only accepts a
//! fixed set of lookbacks, so the requested window is snapped to the
//! smallest one that reaches back to `from`.
//!
//! CoinGecko reports no volume with candles; points carry a volume of 0.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use reqwest::Client;

use crate::errors::MarketDataError;
use crate::models::{Interval, OhlcPoint, TimeWindow};
use crate::provider::http;
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

pub const DEFAULT_QUERY_URL: &str = "https://api.coingecko.com";
const PROVIDER_ID: &str = "COINGECKO";

/// Quote currency of every candle.
const VS_CURRENCY: &str = "usd";

/// Lookbacks accepted by the endpoint, as (more than this many days ago, `days` value).
/// Checked from the longest down; anything within a day asks for "1".
const DAYS_LADDER: [(i64, &str); 7] = [
    (365, "max"),
    (180, "365"),
    (90, "180"),
    (30, "90"),
    (14, "30"),
    (7, "14"),
    (1, "7"),
];

/// Source of "now" used to pick the lookback.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// One candle: `[ms timestamp, open, high, low, close]`.
type Candle = [f64; 5];

/// CoinGecko provider.
pub struct CoingeckoProvider {
    client: Client,
    query_url: String,
    /// Pro API key, sent only when configured
    token: Option<String>,
    clock: Clock,
}

impl CoingeckoProvider {
    pub fn new(client: Client, query_url: &str, token: Option<&str>) -> Self {
        Self {
            client,
            query_url: query_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock used to pick the lookback.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn ohlc_url(&self, ticker: &str) -> String {
        format!("{}/api/v3/coins/{}/ohlc", self.query_url, ticker)
    }
}

/// Snap the age of `from` to the `days` value the endpoint accepts.
pub fn days_param(from: DateTime<Utc>, now: DateTime<Utc>) -> &'static str {
    let age = now - from;
    DAYS_LADDER
        .iter()
        .find(|(days, _)| age > chrono::Duration::days(*days))
        .map(|(_, value)| *value)
        .unwrap_or("1")
}

fn decode_candles(ticker: &str, candles: Vec<Candle>, window: &TimeWindow) -> Vec<OhlcPoint> {
    let mut points = Vec::with_capacity(candles.len());

    for [millis, open, high, low, close] in candles {
        let Some(instant) = Utc.timestamp_millis_opt(millis as i64).single() else {
            warn!("Skipping {} candle with invalid timestamp {}", ticker, millis);
            continue;
        };
        if !window.contains(&instant) {
            continue;
        }

        points.push(OhlcPoint {
            ticker: ticker.to_string(),
            timestamp: instant.fixed_offset(),
            open,
            high,
            low,
            close,
            volume: 0,
        });
    }

    points
}

#[async_trait]
impl MarketDataProvider for CoingeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per(50, Duration::from_secs(60))
    }

    async fn get_ohlc(
        &self,
        ticker: &str,
        _interval: Interval,
        window: &TimeWindow,
    ) -> Result<Vec<OhlcPoint>, MarketDataError> {
        let url = self.ohlc_url(ticker);
        let days = days_param(window.start(), (self.clock)());
        debug!("Fetching CoinGecko candles: {} (days={})", url, days);

        let mut request = self
            .client
            .get(&url)
            .query(&[("days", days), ("vs_currency", VS_CURRENCY)]);
        if let Some(token) = &self.token {
            request = request.query(&[("x_cg_pro_api_key", token.as_str())]);
        }

        let candles: Vec<Candle> = http::get_json(PROVIDER_ID, request).await?;
        let points = decode_candles(ticker, candles, window);
        info!("Fetched {} CoinGecko points for {}", points.len(), ticker);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_OHLC: &str = include_str!("../../../tests/fixtures/coingecko_ohlc.json");

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - chrono::Duration::days(days)
    }

    #[test]
    fn test_days_ladder() {
        let cases = [
            (0, "1"),
            (1, "1"),
            (2, "7"),
            (7, "7"),
            (8, "14"),
            (15, "30"),
            (31, "90"),
            (91, "180"),
            (181, "365"),
            (365, "365"),
            (366, "max"),
        ];
        for (age, expected) in cases {
            assert_eq!(days_param(days_ago(age), now()), expected, "{} days ago", age);
        }
    }

    #[test]
    fn test_days_just_over_a_boundary() {
        let from = days_ago(7) - chrono::Duration::seconds(1);
        assert_eq!(days_param(from, now()), "14");
    }

    #[test]
    fn test_decode_sample_candles() {
        let candles: Vec<Candle> = serde_json::from_str(SAMPLE_OHLC).unwrap();
        let day = Utc.with_ymd_and_hms(2021, 3, 4, 0, 0, 0).unwrap();

        let points = decode_candles("bitcoin", candles, &TimeWindow::new(day, day).unwrap());
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].ticker, "bitcoin");
        assert_eq!(points[0].timestamp, day);
        assert_eq!(points[0].volume, 0);
        assert!((points[0].open - 121.75).abs() < 0.01);
        assert!((points[0].close - 120.13).abs() < 0.01);
    }

    #[test]
    fn test_decode_keeps_upstream_order_within_window() {
        let candles: Vec<Candle> = vec![
            [3_000.0, 3.0, 3.0, 3.0, 3.0],
            [1_000.0, 1.0, 1.0, 1.0, 1.0],
            [9_000.0, 9.0, 9.0, 9.0, 9.0],
        ];
        let window = TimeWindow::new(
            Utc.timestamp_opt(0, 0).unwrap(),
            Utc.timestamp_opt(5, 0).unwrap(),
        )
        .unwrap();

        let closes: Vec<f64> = decode_candles("x", candles, &window)
            .iter()
            .map(|p| p.close)
            .collect();
        assert_eq!(closes, vec![3.0, 1.0]);
    }

    #[test]
    fn test_short_candle_is_decode_failure() {
        let result: Result<Vec<Candle>, _> = serde_json::from_str("[[1, 2, 3]]");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let provider = CoingeckoProvider::new(Client::new(), "http://localhost:1", Some(""));
        assert!(provider.token.is_none());
        assert_eq!(provider.ohlc_url("bitcoin"), "http://localhost:1/api/v3/coins/bitcoin/ohlc");
    }
}
