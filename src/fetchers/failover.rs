//! Failover price fetcher implementation

use crate::{error::FetchError, fetcher::PriceFetcher, types::PriceReading};
use async_trait::async_trait;
use std::sync::Arc;

/// Price fetcher that tries multiple fetchers in order until one succeeds.
pub struct FailoverFetcher {
    fetchers: Vec<Arc<dyn PriceFetcher>>,
}

impl FailoverFetcher {
    /// Creates a new failover fetcher
    ///
    /// The fetchers are tried in the order they are provided.
    pub fn new(fetchers: Vec<Arc<dyn PriceFetcher>>) -> Self {
        Self { fetchers }
    }
}

#[async_trait]
impl PriceFetcher for FailoverFetcher {
    async fn fetch(&self) -> Result<PriceReading, FetchError> {
        let mut last_error = None;

        for fetcher in &self.fetchers {
            match fetcher.fetch().await {
                Ok(reading) => return Ok(reading),
                Err(e) => {
                    tracing::warn!(
                        source = fetcher.source_name(),
                        error = %e,
                        "Source failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FetchError::NetworkFailure("No sources configured for failover".to_string())
        }))
    }

    fn source_name(&self) -> &'static str {
        "failover"
    }
}
