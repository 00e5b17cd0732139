//! Yahoo Finance market data provider.
//!
//! This provider fetches:
//! - OHLC series from the chart API (`/v8/finance/chart/{ticker}`)
//! - Shareholder composition by scraping the holders page
//!   (`/quote/{ticker}/holders`) through the streaming table extractor
//!
//! Yahoo has no multi-ticker endpoint, so batches are fanned out by the
//! pipeline one ticker at a time.

mod chart;
mod holders;
mod models;

pub use holders::{parse_grouped_int, parse_percent, parse_reported_date};

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{header, Client};

use crate::errors::MarketDataError;
use crate::models::{Holders, Interval, OhlcPoint, TimeWindow};
use crate::provider::http;
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

use models::YahooChartResponse;

pub const DEFAULT_BASE_URL: &str = "https://finance.yahoo.com";
pub const DEFAULT_QUERY_URL: &str = "https://query2.finance.yahoo.com";
const PROVIDER_ID: &str = "YAHOO";

/// Yahoo rejects requests without a browser-like agent.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Yahoo Finance provider.
pub struct YahooProvider {
    client: Client,
    /// Website root, for the holders page
    base_url: String,
    /// API root, for the chart endpoint
    query_url: String,
}

impl YahooProvider {
    pub fn new(client: Client, base_url: &str, query_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            query_url: query_url.trim_end_matches('/').to_string(),
        }
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.query_url, ticker)
    }

    fn holders_url(&self, ticker: &str) -> String {
        format!("{}/quote/{}/holders", self.base_url, ticker)
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_holders: true,
            supports_batch: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per(2000, Duration::from_secs(3600))
    }

    async fn get_ohlc(
        &self,
        ticker: &str,
        interval: Interval,
        window: &TimeWindow,
    ) -> Result<Vec<OhlcPoint>, MarketDataError> {
        let url = self.chart_url(ticker);
        debug!("Fetching Yahoo chart: {}", url);

        let request = self
            .client
            .get(&url)
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .query(&chart::chart_query(interval, window));
        let response: YahooChartResponse = http::get_json(PROVIDER_ID, request).await?;

        let points = chart::decode_chart(ticker, response, window)?;
        info!("Fetched {} Yahoo points for {}", points.len(), ticker);
        Ok(points)
    }

    async fn get_holders(&self, ticker: &str) -> Result<Holders, MarketDataError> {
        let url = self.holders_url(ticker);
        debug!("Fetching Yahoo holders page: {}", url);

        let request = self
            .client
            .get(&url)
            .header(header::USER_AGENT, BROWSER_USER_AGENT);
        let tables = http::get_tables(PROVIDER_ID, request).await?;
        debug!("Extracted {} tables from holders page of {}", tables.len(), ticker);

        holders::decode_holders(ticker, &tables)
    }
}
