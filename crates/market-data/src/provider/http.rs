//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::errors::MarketDataError;
use crate::html::{extract_tables_from_stream, Table};

/// Build the connection-pooled client shared by every adapter of a pipeline.
///
/// `dial_timeout` bounds connection setup including the TLS handshake;
/// `request_timeout` bounds each request from send to the end of the body.
pub fn build_client(dial_timeout: Duration, request_timeout: Duration) -> Result<Client, MarketDataError> {
    Client::builder()
        .connect_timeout(dial_timeout)
        .timeout(request_timeout)
        .user_agent(concat!("tinkerbell/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(MarketDataError::from)
}

/// Map a transport error, separating timeouts from other failures.
pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> MarketDataError {
    if error.is_timeout() {
        MarketDataError::Timeout {
            provider: provider.to_string(),
        }
    } else {
        MarketDataError::Network(error)
    }
}

/// Send a request and reject non-success statuses.
pub(crate) async fn send(provider: &str, request: RequestBuilder) -> Result<Response, MarketDataError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;

    debug!("{} responded {} for {}", provider, response.status(), response.url());

    let status = response.status();
    if !status.is_success() {
        return Err(MarketDataError::HttpStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response)
}

/// Send a request and decode its JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T, MarketDataError> {
    let body = send(provider, request)
        .await?
        .bytes()
        .await
        .map_err(|e| transport_error(provider, e))?;

    serde_json::from_slice(&body)
        .map_err(|e| MarketDataError::decode(provider, format!("Failed to parse response: {}", e)))
}

/// Send a request and stream its body through the table extractor.
pub(crate) async fn get_tables(
    provider: &str,
    request: RequestBuilder,
) -> Result<Vec<Table>, MarketDataError> {
    let response = send(provider, request).await?;
    extract_tables_from_stream(response.bytes_stream())
        .await
        .map_err(|e| transport_error(provider, e))
}
