//! Price fetcher implementations

pub mod coinapi;
pub mod coinbase;
pub mod coingecko;
pub mod failover;

pub use coinapi::CoinApiFetcher;
pub use coinbase::CoinbaseFetcher;
pub use coingecko::CoinGeckoFetcher;
pub use failover::FailoverFetcher;

use crate::{constants::USER_AGENT, error::FetchError};
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use std::time::Duration;

/// Builds the HTTP client shared by the REST fetchers
pub(crate) fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Maps throttling and error statuses, then returns the body text
pub(crate) async fn read_body(response: Response) -> Result<String, FetchError> {
    let status = response.status();

    // Check for rate limiting
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(FetchError::RateLimited { retry_after });
    }

    if !status.is_success() {
        return Err(FetchError::NetworkFailure(format!("HTTP {status}")));
    }

    Ok(response.text().await?)
}

/// Parses a JSON body, keeping a prefix of it in the error for diagnosis
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    source: &str,
    body: &str,
) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| {
        let excerpt: String = body.chars().take(200).collect();
        FetchError::malformed(format!(
            "Failed to parse {source} response: {e}. Response: {excerpt}"
        ))
    })
}

/// Parses a decimal price string such as `"50123.45"`
pub(crate) fn parse_price(raw: &str) -> Result<f64, FetchError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FetchError::malformed(format!("price {raw:?} is not numeric")))
}
