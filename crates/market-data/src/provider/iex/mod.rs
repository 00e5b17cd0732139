//! IEX Cloud market data provider.
//!
//! Uses the market batch endpoint, which returns the charts of up to 100
//! tickers in one response:
//!
//! `GET {query_url}/v1/stock/market/batch?token=..&symbols=A,B&range=5d&types=chart`
//!
//! The response maps each ticker to `{"chart": [...]}`. A single-ticker
//! request is a batch of one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::errors::MarketDataError;
use crate::models::{Chart, Interval, OhlcPoint, Ticker, TimeWindow};
use crate::provider::http;
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

pub const DEFAULT_QUERY_URL: &str = "https://cloud.iexapis.com";
const PROVIDER_ID: &str = "IEX";

/// Maximum number of symbols per batch request.
pub const BATCH_MAX_LEN: usize = 100;

/// Smallest lookback requested, in days.
const MIN_RANGE_DAYS: i64 = 5;

/// Source of "now" used to derive the lookback range.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Per-ticker entry of a batch response.
#[derive(Debug, Deserialize)]
struct IexTickerData {
    #[serde(default)]
    chart: Vec<IexChartPoint>,
}

/// One bar of an IEX chart.
#[derive(Debug, Deserialize)]
struct IexChartPoint {
    /// Trading day, "YYYY-MM-DD"
    date: String,
    /// Time of day for intraday bars, "HH:MM"
    #[serde(default)]
    minute: Option<String>,
    #[serde(default)]
    volume: Option<i64>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
}

type BatchResponse = HashMap<String, IexTickerData>;

/// IEX Cloud provider.
pub struct IexProvider {
    client: Client,
    query_url: String,
    token: String,
    clock: Clock,
}

impl IexProvider {
    pub fn new(client: Client, query_url: &str, token: &str) -> Self {
        Self {
            client,
            query_url: query_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock used to derive the lookback range.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn batch_url(&self) -> String {
        format!("{}/v1/stock/market/batch", self.query_url)
    }

    async fn fetch_chunk(
        &self,
        tickers: &[Ticker],
        window: &TimeWindow,
    ) -> Result<BatchResponse, MarketDataError> {
        let range = range_param(window, (self.clock)());
        let symbols = tickers.join(",");
        debug!("Fetching IEX batch of {} symbols, range {}", tickers.len(), range);

        let request = self.client.get(self.batch_url()).query(&[
            ("token", self.token.as_str()),
            ("symbols", symbols.as_str()),
            ("range", range.as_str()),
            ("types", "chart"),
        ]);
        http::get_json(PROVIDER_ID, request).await
    }

    /// Fetch one chunk and push every decoded ticker into `sink`.
    async fn deliver_chunk(
        &self,
        tickers: &[Ticker],
        window: &TimeWindow,
        sink: &mpsc::Sender<Chart>,
    ) -> Result<usize, MarketDataError> {
        let response = self.fetch_chunk(tickers, window).await?;

        let mut delivered = 0;
        for (ticker, data) in response {
            let points = decode_chart(&ticker, data.chart, window);
            if sink.send(Chart::new(ticker, points)).await.is_err() {
                debug!("IEX batch sink closed, stopping delivery");
                break;
            }
            delivered += 1;
        }
        Ok(delivered)
    }
}

/// Derive the `range` query parameter.
///
/// The lookback is counted from `now` to `from` in whole days, rounded up
/// and never below five. Windows of at most a day request "1d".
pub fn range_param(window: &TimeWindow, now: DateTime<Utc>) -> String {
    if window.span() <= chrono::Duration::days(1) {
        return "1d".to_string();
    }

    let hours = (now - window.start()).num_seconds() as f64 / 3600.0;
    let days = (hours / 24.0).ceil() as i64;
    format!("{}d", days.max(MIN_RANGE_DAYS))
}

/// Parse a bar time from its date and optional "HH:MM" minute.
///
/// An unparseable minute falls back to the start of the day.
fn bar_timestamp(date: &str, minute: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = minute
        .and_then(|m| NaiveTime::parse_from_str(m, "%H:%M").ok())
        .unwrap_or(NaiveTime::MIN);
    Some(day.and_time(time).and_utc().fixed_offset())
}

fn decode_chart(ticker: &str, chart: Vec<IexChartPoint>, window: &TimeWindow) -> Vec<OhlcPoint> {
    let mut points = Vec::with_capacity(chart.len());

    for bar in chart {
        let Some(timestamp) = bar_timestamp(&bar.date, bar.minute.as_deref()) else {
            warn!("Skipping {} point with invalid date '{}'", ticker, bar.date);
            continue;
        };
        if !window.contains(&timestamp) {
            continue;
        }
        let (Some(open), Some(high), Some(low), Some(close)) = (bar.open, bar.high, bar.low, bar.close)
        else {
            warn!("Skipping {} point at {} with missing values", ticker, timestamp);
            continue;
        };

        points.push(OhlcPoint {
            ticker: ticker.to_string(),
            timestamp,
            open,
            high,
            low,
            close,
            volume: bar.volume.unwrap_or(0),
        });
    }

    points
}

#[async_trait]
impl MarketDataProvider for IexProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_holders: false,
            supports_batch: true,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per(100, Duration::from_secs(1))
    }

    async fn get_ohlc(
        &self,
        ticker: &str,
        _interval: Interval,
        window: &TimeWindow,
    ) -> Result<Vec<OhlcPoint>, MarketDataError> {
        let tickers = [ticker.to_string()];
        let mut response = self.fetch_chunk(&tickers, window).await?;

        let points = response
            .remove(ticker)
            .map(|data| decode_chart(ticker, data.chart, window))
            .unwrap_or_default();
        info!("Fetched {} IEX points for {}", points.len(), ticker);
        Ok(points)
    }

    async fn get_ohlc_batch(
        &self,
        tickers: &[Ticker],
        _interval: Interval,
        window: &TimeWindow,
        sink: mpsc::Sender<Chart>,
    ) -> Result<usize, MarketDataError> {
        let chunks: Vec<&[Ticker]> = tickers.chunks(BATCH_MAX_LEN).collect();
        debug!("Splitting {} IEX tickers into {} requests", tickers.len(), chunks.len());

        let results = join_all(
            chunks
                .iter()
                .map(|chunk| self.deliver_chunk(chunk, window, &sink)),
        )
        .await;

        let mut delivered = 0;
        for (chunk, result) in chunks.iter().zip(results) {
            match result {
                Ok(count) => delivered += count,
                Err(e) => warn!(
                    "IEX batch of {} tickers starting at {} failed ({}): {}",
                    chunk.len(),
                    chunk.first().map(String::as_str).unwrap_or_default(),
                    e.category(),
                    e
                ),
            }
        }

        info!("IEX batch delivered {} of {} tickers", delivered, tickers.len());
        Ok(delivered)
    }
}
