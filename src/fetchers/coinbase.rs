//! Coinbase spot price fetcher

use super::{http_client, parse_json, parse_price, read_body};
use crate::{
    error::FetchError,
    fetcher::PriceFetcher,
    types::{CurrencyPair, PriceReading},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Coinbase API response for spot price queries
#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotPrice,
}

#[derive(Debug, Deserialize)]
struct SpotPrice {
    amount: String,
    base: String,
    currency: String,
}

/// Coinbase spot price fetcher
pub struct CoinbaseFetcher {
    client: Client,
    url: String,
    pair: CurrencyPair,
}

impl CoinbaseFetcher {
    /// Creates a new Coinbase fetcher
    pub fn new(
        endpoint: &str,
        pair: CurrencyPair,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let url = format!(
            "{}/v2/prices/{}-{}/spot",
            endpoint.trim_end_matches('/'),
            pair.base(),
            pair.quote()
        );

        Ok(Self {
            client: http_client(timeout)?,
            url,
            pair,
        })
    }

    /// Parses the Coinbase response body into a reading
    fn parse_body(&self, body: &str) -> Result<PriceReading, FetchError> {
        let response: SpotResponse = parse_json(self.source_name(), body)?;
        let spot = response.data;

        if !spot.base.eq_ignore_ascii_case(self.pair.base())
            || !spot.currency.eq_ignore_ascii_case(self.pair.quote())
        {
            return Err(FetchError::malformed(format!(
                "expected {} but Coinbase answered {}/{}",
                self.pair, spot.base, spot.currency
            )));
        }

        let value = parse_price(&spot.amount)?;
        PriceReading::new(value, self.pair.clone(), self.source_name())
    }
}

#[async_trait]
impl PriceFetcher for CoinbaseFetcher {
    async fn fetch(&self) -> Result<PriceReading, FetchError> {
        tracing::debug!(url = %self.url, "Fetching price from Coinbase");

        let response = self.client.get(&self.url).send().await?;
        let body = read_body(response).await?;
        self.parse_body(&body)
    }

    fn source_name(&self) -> &'static str {
        "coinbase"
    }
}
