//! Pipeline configuration.
//!
//! Loading (flags, environment, `.env`) is the caller's job; this module
//! only defines the settings, their defaults and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::MarketDataError;
use crate::models::Ticker;
use crate::provider::{coingecko, iex, yahoo, ProviderKind};

/// Default connection setup timeout.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default overall per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const MASK: &str = "********";

/// Everything needed to construct an acquisition pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Which upstream source to use
    pub provider: ProviderKind,

    /// Yahoo website root, for holders pages
    pub yahoo_finance_url: String,

    /// Yahoo API root, for charts
    pub yahoo_finance_query_url: String,

    pub iex_cloud_query_url: String,

    /// Required when `provider` is IEX
    pub iex_cloud_secret_token: Option<String>,

    pub coingecko_query_url: String,

    /// Optional pro API key
    pub coingecko_secret_token: Option<String>,

    /// Bound on connection setup, including the TLS handshake
    pub dial_timeout: Duration,

    /// Bound on each request from send to the end of the body
    pub request_timeout: Duration,

    /// Rate limiter burst size; also the number of requests allowed at once
    pub bursts: u32,

    /// Tickers to operate on when the caller gives none
    pub tickers: Vec<Ticker>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            yahoo_finance_url: yahoo::DEFAULT_BASE_URL.to_string(),
            yahoo_finance_query_url: yahoo::DEFAULT_QUERY_URL.to_string(),
            iex_cloud_query_url: iex::DEFAULT_QUERY_URL.to_string(),
            iex_cloud_secret_token: None,
            coingecko_query_url: coingecko::DEFAULT_QUERY_URL.to_string(),
            coingecko_secret_token: None,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            bursts: 1,
            tickers: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        if self.bursts == 0 {
            return Err(invalid("bursts must be at least 1"));
        }
        if self.dial_timeout.is_zero() {
            return Err(invalid("dial-timeout must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid("request-timeout must be greater than zero"));
        }

        for (name, value) in [
            ("yahoo-finance-url", &self.yahoo_finance_url),
            ("yahoo-finance-query-url", &self.yahoo_finance_query_url),
            ("iex-cloud-query-url", &self.iex_cloud_query_url),
            ("coingecko-query-url", &self.coingecko_query_url),
        ] {
            Url::parse(value).map_err(|e| invalid(&format!("{} '{}' is not a valid URL: {}", name, value, e)))?;
        }

        let iex_token_missing = !matches!(
            self.iex_cloud_secret_token.as_deref(),
            Some(token) if !token.trim().is_empty()
        );
        if self.provider == ProviderKind::Iex && iex_token_missing {
            return Err(invalid("iex-cloud-secret-token is required for the iex provider"));
        }

        Ok(())
    }

    /// Copy with secrets replaced, safe to print.
    pub fn masked(&self) -> Self {
        let mask = |token: &Option<String>| token.as_ref().map(|_| MASK.to_string());
        Self {
            iex_cloud_secret_token: mask(&self.iex_cloud_secret_token),
            coingecko_secret_token: mask(&self.coingecko_secret_token),
            ..self.clone()
        }
    }
}

fn invalid(message: &str) -> MarketDataError {
    MarketDataError::InvalidConfig {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.provider, ProviderKind::Yahoo);
        assert_eq!(config.yahoo_finance_url, "https://finance.yahoo.com");
        assert_eq!(config.yahoo_finance_query_url, "https://query2.finance.yahoo.com");
        assert_eq!(config.dial_timeout, Duration::from_secs(5));
        assert_eq!(config.bursts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_bursts_rejected() {
        let config = PipelineConfig {
            bursts: 0,
            ..Default::default()
        };
        let error = config.validate().unwrap_err();
        assert_eq!(error.to_string(), "Invalid configuration: bursts must be at least 1");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = PipelineConfig {
            dial_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_url_rejected() {
        let config = PipelineConfig {
            coingecko_query_url: "not a url".to_string(),
            ..Default::default()
        };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("coingecko-query-url"));
    }

    #[test]
    fn test_iex_requires_token() {
        let mut config = PipelineConfig {
            provider: ProviderKind::Iex,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.iex_cloud_secret_token = Some("  ".to_string());
        assert!(config.validate().is_err());

        config.iex_cloud_secret_token = Some("SECRET_TOKEN".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_masked_hides_tokens() {
        let config = PipelineConfig {
            iex_cloud_secret_token: Some("SECRET_TOKEN".to_string()),
            ..Default::default()
        };
        let masked = config.masked();
        assert_eq!(masked.iex_cloud_secret_token.as_deref(), Some(MASK));
        assert_eq!(masked.coingecko_secret_token, None);
        assert!(!format!("{:?}", masked).contains("SECRET_TOKEN"));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"provider": "coingecko", "bursts": 3, "tickers": ["bitcoin"]}"#).unwrap();
        assert_eq!(config.provider, ProviderKind::Coingecko);
        assert_eq!(config.bursts, 3);
        assert_eq!(config.tickers, vec!["bitcoin".to_string()]);
        assert_eq!(config.coingecko_query_url, "https://api.coingecko.com");
    }
}
