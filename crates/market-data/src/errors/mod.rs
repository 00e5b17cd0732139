//! Error types and error classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`ErrorCategory`]: Coarse classification used when logging isolated failures

mod category;

pub use category::ErrorCategory;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant maps to an [`ErrorCategory`] via [`category`](Self::category).
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested interval is not one of the supported values.
    /// Raised before any network access.
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// The requested time window ends before it starts.
    #[error("Invalid time window: {from} is after {to}")]
    InvalidWindow {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// The pipeline configuration is unusable.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the offending setting
        message: String,
    },

    /// The configured provider does not offer this operation.
    #[error("Operation '{operation}' is not supported by {provider}")]
    NotSupported {
        /// The operation that was requested
        operation: String,
        /// The provider that rejected it
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("Non-OK HTTP status from {provider}: {status}")]
    HttpStatus {
        /// The provider that returned the status
        provider: String,
        /// The HTTP status code
        status: u16,
    },

    /// The payload could not be decoded, or lacked the expected structure.
    #[error("Decode error: {provider} - {message}")]
    Decode {
        /// The provider whose payload failed to decode
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// The caller cancelled the operation while it was waiting.
    #[error("Operation cancelled")]
    Cancelled,

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Shorthand for a [`MarketDataError::Decode`] error.
    pub fn decode(provider: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`MarketDataError::NotSupported`] error.
    pub fn not_supported(operation: &str, provider: &str) -> Self {
        Self::NotSupported {
            operation: operation.to_string(),
            provider: provider.to_string(),
        }
    }

    /// Returns the category of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tinkerbell_market_data::errors::{ErrorCategory, MarketDataError};
    ///
    /// let error = MarketDataError::InvalidInterval("2w".to_string());
    /// assert_eq!(error.category(), ErrorCategory::Validation);
    ///
    /// let error = MarketDataError::HttpStatus { provider: "IEX".to_string(), status: 502 };
    /// assert_eq!(error.category(), ErrorCategory::Transport);
    /// ```
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInterval(_) | Self::InvalidWindow { .. } | Self::InvalidConfig { .. } => {
                ErrorCategory::Validation
            }

            Self::NotSupported { .. } => ErrorCategory::Unsupported,

            Self::Timeout { .. } | Self::HttpStatus { .. } => ErrorCategory::Transport,

            // reqwest reports body decoding problems through the same error type
            Self::Network(e) if e.is_decode() => ErrorCategory::Decode,
            Self::Network(_) => ErrorCategory::Transport,

            Self::Decode { .. } => ErrorCategory::Decode,

            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }
}
