//! Market data models
//!
//! This module contains the canonical data types every provider converts into:
//! - `types` - Type aliases for common identifiers (ProviderId, Ticker)
//! - `interval` - The closed set of chart intervals (Interval)
//! - `ohlc` - Price series data (OhlcPoint, Chart) and the filter window (TimeWindow)
//! - `holders` - Shareholder composition (HoldersBreakdown, HoldersTable, HoldersRow, Holders)

mod holders;
mod interval;
mod ohlc;
mod types;

pub use holders::{Holders, HoldersBreakdown, HoldersRow, HoldersTable};
pub use interval::Interval;
pub use ohlc::{Chart, OhlcPoint, TimeWindow};
pub use types::{ProviderId, Ticker};
