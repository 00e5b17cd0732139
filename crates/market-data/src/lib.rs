//! Tinkerbell Market Data Crate
//!
//! This crate fetches historical price series and shareholder composition
//! for financial tickers from several upstream sources and normalizes them
//! into one model.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Three providers: Yahoo Finance, IEX Cloud, CoinGecko
//! - Streaming extraction of `<table>` data from HTML pages
//! - Rate limiting with a per-provider token bucket
//! - Concurrent multi-ticker batches converging on one channel
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |      Caller      |  (CLI, service, tests)
//! +------------------+
//!          |
//!          v
//! +---------------------+     +------------------+
//! | AcquisitionPipeline | --> |   RateLimiter    |  (one permit per request)
//! +---------------------+     +------------------+
//!          |
//!          v
//! +------------------+        +------------------+
//! |     Provider     | -----> |  TableExtractor  |  (Yahoo holders only)
//! +------------------+        +------------------+
//!          |
//!          v
//! +------------------+
//! | OhlcPoint/Holders|  (normalized records)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`AcquisitionPipeline`] - Entry point bound to one configured provider
//! - [`PipelineConfig`] - Provider selection, URLs, tokens, timeouts, burst size
//! - [`OhlcPoint`] / [`Chart`] - Price series
//! - [`Holders`] - Breakdown plus institutional and fund holder tables
//! - [`TableExtractor`] - Push-based `<table>` extractor

pub mod config;
pub mod errors;
pub mod html;
pub mod models;
pub mod pipeline;
pub mod provider;

pub use config::PipelineConfig;
pub use errors::{ErrorCategory, MarketDataError};
pub use html::{extract_tables, extract_tables_from_stream, Table, TableExtractor};

// Re-export all public types from models
pub use models::{
    Chart, Holders, HoldersBreakdown, HoldersRow, HoldersTable, Interval, OhlcPoint, ProviderId,
    Ticker, TimeWindow,
};

// Re-export provider types
pub use provider::coingecko::CoingeckoProvider;
pub use provider::iex::IexProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::{
    build_provider, MarketDataProvider, ProviderCapabilities, ProviderKind, RateLimit,
};

// Re-export pipeline types
pub use pipeline::{AcquisitionPipeline, BatchReceiver, BatchSummary, RateLimiter};

/// Re-exported so callers can cancel pipeline operations without a direct dependency.
pub use tokio_util::sync::CancellationToken;
