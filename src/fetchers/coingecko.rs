//! CoinGecko price fetcher implementation

use super::{http_client, parse_json, read_body};
use crate::{
    constants::COINGECKO_SIMPLE_PRICE_ENDPOINT,
    error::FetchError,
    fetcher::PriceFetcher,
    types::{CurrencyPair, PriceReading},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// CoinGecko API response for simple price queries
///
/// Shaped as `{"bitcoin": {"usd": 50000.0}}`.
#[derive(Debug, Deserialize)]
struct CoinGeckoResponse {
    #[serde(flatten)]
    prices: HashMap<String, HashMap<String, serde_json::Value>>,
}

/// CoinGecko price fetcher
pub struct CoinGeckoFetcher {
    client: Client,
    url: String,
    pair: CurrencyPair,
}

impl CoinGeckoFetcher {
    /// Creates a new CoinGecko fetcher
    pub fn new(
        endpoint: &str,
        pair: CurrencyPair,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let url = format!(
            "{}{}?ids={}&vs_currencies={}",
            endpoint.trim_end_matches('/'),
            COINGECKO_SIMPLE_PRICE_ENDPOINT,
            pair.coingecko_id(),
            pair.quote().to_ascii_lowercase()
        );

        Ok(Self {
            client: http_client(timeout)?,
            url,
            pair,
        })
    }

    /// Parses the CoinGecko response into a reading
    fn parse_body(&self, body: &str) -> Result<PriceReading, FetchError> {
        let response: CoinGeckoResponse = parse_json(self.source_name(), body)?;
        let id = self.pair.coingecko_id();
        let quote = self.pair.quote().to_ascii_lowercase();

        let value = response
            .prices
            .get(&id)
            .and_then(|quotes| quotes.get(&quote))
            .ok_or_else(|| {
                FetchError::malformed(format!("No {id}/{quote} price returned from CoinGecko"))
            })?
            .as_f64()
            .ok_or_else(|| FetchError::malformed(format!("{id}/{quote} price is not numeric")))?;

        PriceReading::new(value, self.pair.clone(), self.source_name())
    }
}

#[async_trait]
impl PriceFetcher for CoinGeckoFetcher {
    async fn fetch(&self) -> Result<PriceReading, FetchError> {
        tracing::debug!(url = %self.url, "Fetching price from CoinGecko");

        let response = self.client.get(&self.url).send().await?;
        let body = read_body(response).await?;
        self.parse_body(&body)
    }

    fn source_name(&self) -> &'static str {
        "coingecko"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_builds_query_and_parses() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/simple/price")
                    .query_param("ids", "bitcoin")
                    .query_param("vs_currencies", "usd");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"bitcoin":{"usd":64250.5}}"#);
            })
            .await;

        let fetcher = CoinGeckoFetcher::new(
            &server.base_url(),
            "BTC/USD".parse().unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();

        let reading = fetcher.fetch().await.unwrap();
        mock.assert_async().await;
        assert_eq!(reading.value(), 64250.5);
        assert_eq!(reading.source(), "coingecko");
    }

    #[tokio::test]
    async fn test_rate_limit_without_hint() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/simple/price");
                then.status(429)
                    .body(r#"{"status":{"error_code":429,"error_message":"You've exceeded the Rate Limit."}}"#);
            })
            .await;

        let fetcher = CoinGeckoFetcher::new(
            &server.base_url(),
            "BTC/USD".parse().unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();
        assert_eq!(
            fetcher.fetch().await.unwrap_err(),
            FetchError::RateLimited { retry_after: None }
        );
    }

    #[test]
    fn test_parse_missing_or_non_numeric_price() {
        let fetcher = CoinGeckoFetcher::new(
            "http://localhost",
            "BTC/USD".parse().unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();

        for body in [
            r#"{}"#,
            r#"{"bitcoin":{"eur":1.0}}"#,
            r#"{"bitcoin":{"usd":"lots"}}"#,
            r#"{"bitcoin":{"usd":0}}"#,
        ] {
            let err = fetcher.parse_body(body).unwrap_err();
            assert!(matches!(err, FetchError::MalformedResponse(_)), "{body}");
        }
    }
}
