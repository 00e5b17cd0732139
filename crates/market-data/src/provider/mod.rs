//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities and rate limiting configuration
//! - Concrete provider implementations (Yahoo, IEX Cloud, CoinGecko)
//! - `ProviderKind` and `build_provider` for selecting one from configuration
//!
//! # Architecture
//!
//! Providers are stateless translators between the canonical model and one
//! upstream wire format. Rate limiting, cancellation and multi-ticker
//! fan-out are owned by the acquisition pipeline, so an adapter only needs
//! to build requests and decode payloads.

mod capabilities;
mod http;
mod kind;
mod traits;

pub mod coingecko;
pub mod iex;
pub mod yahoo;

// Re-exports
pub use capabilities::{ProviderCapabilities, RateLimit};
pub use http::build_client;
pub use kind::{build_provider, ProviderKind};
pub use traits::MarketDataProvider;
