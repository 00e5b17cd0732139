use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Inclusive `[from, to]` window a series is filtered to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting one that ends before it starts.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, MarketDataError> {
        if from > to {
            return Err(MarketDataError::InvalidWindow { from, to });
        }
        Ok(Self { from, to })
    }

    /// Lower bound (inclusive).
    pub fn start(&self) -> DateTime<Utc> {
        self.from
    }

    /// Upper bound (inclusive).
    pub fn end(&self) -> DateTime<Utc> {
        self.to
    }

    /// Length of the window.
    pub fn span(&self) -> chrono::Duration {
        self.to - self.from
    }

    /// Whether `timestamp` falls inside the window, bounds included.
    ///
    /// Works for any offset: instants are compared, not wall clock values.
    pub fn contains<Tz: chrono::TimeZone>(&self, timestamp: &DateTime<Tz>) -> bool {
        let instant = timestamp.with_timezone(&Utc);
        self.from <= instant && instant <= self.to
    }
}

/// One open/high/low/close bucket of a price series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OhlcPoint {
    pub ticker: String,

    /// Bucket time, in the exchange time zone when the provider reports one
    pub timestamp: DateTime<FixedOffset>,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,

    /// Traded volume, 0 when the source does not report it
    pub volume: i64,
}

/// The series of one ticker, in upstream order.
///
/// This is the unit delivered on a batch sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub ticker: String,
    pub points: Vec<OhlcPoint>,
}

impl Chart {
    pub fn new(ticker: impl Into<String>, points: Vec<OhlcPoint>) -> Self {
        Self {
            ticker: ticker.into(),
            points,
        }
    }
}
