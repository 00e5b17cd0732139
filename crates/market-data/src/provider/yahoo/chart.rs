//! Yahoo chart endpoint: request parameters and payload decoding.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use log::warn;

use crate::errors::MarketDataError;
use crate::models::{Interval, OhlcPoint, TimeWindow};

use super::models::YahooChartResponse;
use super::PROVIDER_ID;

/// Query parameters for a chart request.
///
/// Windows shorter than a day are widened to one day upstream so that a
/// daily bar covering `from` is returned; filtering still uses `window`.
pub(super) fn chart_query(interval: Interval, window: &TimeWindow) -> Vec<(&'static str, String)> {
    let from = window.start();
    let mut to = window.end();
    if window.span() < Duration::days(1) {
        to = from + Duration::days(1);
    }

    vec![
        ("interval", interval.to_string()),
        ("period1", from.timestamp().to_string()),
        ("period2", to.timestamp().to_string()),
        ("region", "US".to_string()),
        ("corsDomain", "com.finance.yahoo".to_string()),
    ]
}

/// Resolve the exchange time zone reported in the chart metadata.
fn exchange_zone(name: &str) -> Result<Tz, MarketDataError> {
    if name.is_empty() {
        return Ok(chrono_tz::UTC);
    }
    name.parse::<Tz>()
        .map_err(|_| MarketDataError::decode(PROVIDER_ID, format!("Unknown exchange time zone '{}'", name)))
}

/// Convert a chart payload into points within `window`, in upstream order.
pub(super) fn decode_chart(
    ticker: &str,
    response: YahooChartResponse,
    window: &TimeWindow,
) -> Result<Vec<OhlcPoint>, MarketDataError> {
    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "Chart response has no result"))?;

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| MarketDataError::decode(PROVIDER_ID, "Chart result has no quote block"))?;

    let zone = exchange_zone(&result.meta.exchange_timezone_name)?;

    let mut points = Vec::with_capacity(result.timestamps.len());
    for (index, &seconds) in result.timestamps.iter().enumerate() {
        let Some(instant) = Utc.timestamp_opt(seconds, 0).single() else {
            warn!("Skipping {} point with invalid timestamp {}", ticker, seconds);
            continue;
        };
        if !window.contains(&instant) {
            continue;
        }
        let Some(bar) = quote.bar(index) else {
            warn!("Skipping {} point at {} with missing values", ticker, instant);
            continue;
        };

        points.push(OhlcPoint {
            ticker: ticker.to_string(),
            timestamp: localize(instant, zone),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        });
    }

    Ok(points)
}

fn localize(instant: DateTime<Utc>, zone: Tz) -> DateTime<chrono::FixedOffset> {
    instant.with_timezone(&zone).fixed_offset()
}
