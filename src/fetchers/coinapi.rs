//! CoinAPI exchange-rate fetcher
//!
//! CoinAPI requires an API key sent in the `X-CoinAPI-Key` header. Its
//! response carries the exchange-side timestamp, which is kept as the
//! reading's `source_time`.

use super::{http_client, parse_json, read_body};
use crate::{
    error::FetchError,
    fetcher::PriceFetcher,
    types::{CurrencyPair, PriceReading},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const API_KEY_HEADER: &str = "X-CoinAPI-Key";

#[derive(Debug, Deserialize)]
struct ExchangeRateResponse {
    time: Option<DateTime<Utc>>,
    asset_id_base: String,
    asset_id_quote: String,
    rate: f64,
}

/// CoinAPI REST fetcher
pub struct CoinApiFetcher {
    client: Client,
    url: String,
    api_key: String,
    pair: CurrencyPair,
}

impl CoinApiFetcher {
    /// Creates a new CoinAPI fetcher
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        pair: CurrencyPair,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let url = format!(
            "{}/v1/exchangerate/{}/{}",
            endpoint.trim_end_matches('/'),
            pair.base(),
            pair.quote()
        );

        Ok(Self {
            client: http_client(timeout)?,
            url,
            api_key: api_key.into(),
            pair,
        })
    }

    fn parse_body(&self, body: &str) -> Result<PriceReading, FetchError> {
        let rate: ExchangeRateResponse = parse_json(self.source_name(), body)?;

        if !rate.asset_id_base.eq_ignore_ascii_case(self.pair.base())
            || !rate.asset_id_quote.eq_ignore_ascii_case(self.pair.quote())
        {
            return Err(FetchError::malformed(format!(
                "expected {} but CoinAPI answered {}/{}",
                self.pair, rate.asset_id_base, rate.asset_id_quote
            )));
        }

        let reading = PriceReading::new(rate.rate, self.pair.clone(), self.source_name())?;
        Ok(match rate.time {
            Some(time) => reading.with_source_time(time),
            None => reading,
        })
    }
}

#[async_trait]
impl PriceFetcher for CoinApiFetcher {
    async fn fetch(&self) -> Result<PriceReading, FetchError> {
        tracing::debug!(url = %self.url, "Fetching price from CoinAPI");

        let response = self
            .client
            .get(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let body = read_body(response).await?;
        self.parse_body(&body)
    }

    fn source_name(&self) -> &'static str {
        "coinapi"
    }
}
