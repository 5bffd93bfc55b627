//! # BTC Price Ticker
//!
//! Keeps the latest BTC/USD price from a public exchange API in memory and
//! serves it without ever blocking on the network.
//!
//! A background poller fetches one reading per tick, publishes it into a
//! shared snapshot and backs off exponentially while the source is failing.
//! Readers always get the last accepted reading (with its freshness) or
//! `None` before the first success.
//!
//! ## Usage
//!
//! ```no_run
//! use btc_ticker::{Ticker, TickerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ticker = Ticker::new(TickerConfig::default())?;
//! let poller = ticker.spawn()?;
//!
//! if let Some((reading, freshness)) = ticker.current() {
//!     println!("{}: ${:.2} ({:?})", reading.pair(), reading.value(), freshness);
//! }
//!
//! poller.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod fetchers;
pub mod metrics;
pub mod server;
pub mod store;
pub mod telemetry;
pub mod ticker;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, SourceKind, TickerConfig};
pub use error::{ConfigError, FetchError, PollerError, ReadError};
pub use fetcher::PriceFetcher;
pub use metrics::FetchMetrics;
pub use store::TickerState;
pub use ticker::{PollerHandle, Ticker, TickerReader};
pub use types::{
    ComponentHealth, CurrencyPair, Freshness, HealthStatus, PriceReading, TickerEvent,
};
