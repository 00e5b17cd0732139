use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::errors::MarketDataError;

use super::coingecko::CoingeckoProvider;
use super::iex::IexProvider;
use super::yahoo::YahooProvider;
use super::MarketDataProvider;

/// The upstream source a pipeline is bound to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Iex,
    Coingecko,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Yahoo, ProviderKind::Iex, ProviderKind::Coingecko];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Yahoo => "yahoo",
            ProviderKind::Iex => "iex",
            ProviderKind::Coingecko => "coingecko",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = MarketDataError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MarketDataError::InvalidConfig {
                message: format!(
                    "Unknown provider '{}', expected one of: yahoo, iex, coingecko",
                    s
                ),
            })
    }
}

/// Construct the adapter selected by `config`, sharing `client`.
pub fn build_provider(config: &PipelineConfig, client: Client) -> Arc<dyn MarketDataProvider> {
    match config.provider {
        ProviderKind::Yahoo => Arc::new(YahooProvider::new(
            client,
            &config.yahoo_finance_url,
            &config.yahoo_finance_query_url,
        )),
        ProviderKind::Iex => Arc::new(IexProvider::new(
            client,
            &config.iex_cloud_query_url,
            config.iex_cloud_secret_token.as_deref().unwrap_or_default(),
        )),
        ProviderKind::Coingecko => Arc::new(CoingeckoProvider::new(
            client,
            &config.coingecko_query_url,
            config.coingecko_secret_token.as_deref(),
        )),
    }
}
