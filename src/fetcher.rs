//! Fetcher abstraction for pulling one price reading from an external source

use crate::{error::FetchError, types::PriceReading};
use async_trait::async_trait;

/// Trait for price fetchers
///
/// A fetcher performs exactly one round-trip per call and never retries;
/// retry policy belongs to the poller.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Fetches the current price
    ///
    /// # Returns
    /// A validated reading, or the reason the round-trip failed
    async fn fetch(&self) -> Result<PriceReading, FetchError>;

    /// Returns the name of this source
    fn source_name(&self) -> &'static str;
}
