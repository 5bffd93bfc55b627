//! Types for the ticker

use crate::{
    constants::{DEFAULT_BASE, DEFAULT_QUOTE},
    error::{ConfigError, FetchError},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// A base/quote currency pair such as `BTC/USD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    /// Creates a pair from its two symbols, upper-casing both
    pub fn new(base: &str, quote: &str) -> Result<Self, ConfigError> {
        let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid(base) || !valid(quote) {
            return Err(ConfigError::InvalidPair(format!("{base}/{quote}")));
        }
        Ok(Self {
            base: base.to_ascii_uppercase(),
            quote: quote.to_ascii_uppercase(),
        })
    }

    /// The asset being priced (e.g. `BTC`)
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The currency the price is expressed in (e.g. `USD`)
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Get the CoinGecko ID for the base asset
    pub fn coingecko_id(&self) -> String {
        match self.base.as_str() {
            "BTC" => "bitcoin".to_string(),
            "ETH" => "ethereum".to_string(),
            "SOL" => "solana".to_string(),
            "USDC" => "usd-coin".to_string(),
            "USDT" => "tether".to_string(),
            other => other.to_ascii_lowercase(),
        }
    }
}

impl Default for CurrencyPair {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE.to_string(),
            quote: DEFAULT_QUOTE.to_string(),
        }
    }
}

impl FromStr for CurrencyPair {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .trim()
            .split_once(['/', '-', '_'])
            .ok_or_else(|| ConfigError::InvalidPair(s.to_string()))?;
        Self::new(base, quote).map_err(|_| ConfigError::InvalidPair(s.to_string()))
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyPair> for String {
    fn from(pair: CurrencyPair) -> Self {
        pair.to_string()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// One normalized price observation
///
/// Readings are immutable: the value is validated once, at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceReading {
    value: f64,
    pair: CurrencyPair,
    observed_at: DateTime<Utc>,
    source: String,
    source_time: Option<DateTime<Utc>>,
}

impl PriceReading {
    /// Create a reading observed now
    pub fn new(
        value: f64,
        pair: CurrencyPair,
        source: impl Into<String>,
    ) -> Result<Self, FetchError> {
        Self::observed(value, pair, source, Utc::now())
    }

    /// Create a reading observed at the given time
    ///
    /// Rejects non-finite and non-positive values.
    pub fn observed(
        value: f64,
        pair: CurrencyPair,
        source: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(FetchError::malformed(format!(
                "price for {pair} must be a positive number, got {value}"
            )));
        }

        Ok(Self {
            value,
            pair,
            observed_at,
            source: source.into(),
            source_time: None,
        })
    }

    /// Attach the timestamp reported by the source itself
    pub fn with_source_time(mut self, source_time: DateTime<Utc>) -> Self {
        self.source_time = Some(source_time);
        self
    }

    pub(crate) fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    /// When this process confirmed the price
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Exchange-reported time of the price, when the source provides one
    pub fn source_time(&self) -> Option<DateTime<Utc>> {
        self.source_time
    }

    /// Age of the reading at `now`, clamped to zero for future timestamps
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.observed_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Classify the reading against a staleness threshold
    pub fn freshness_at(&self, threshold: Duration, now: DateTime<Utc>) -> Freshness {
        if self.age_at(now) > threshold {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}

/// Whether a reading is recent enough to trust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Ticker events published to subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TickerEvent {
    /// A reading was accepted
    PriceUpdated {
        id: Uuid,
        pair: CurrencyPair,
        old_value: Option<f64>,
        new_value: f64,
        source: String,
        timestamp: DateTime<Utc>,
    },

    /// A fetch failed and the poller backed off
    FetchFailed {
        id: Uuid,
        pair: CurrencyPair,
        error_kind: &'static str,
        error_message: String,
        consecutive_failures: u32,
        #[serde(with = "duration_millis")]
        retry_in: Duration,
        timestamp: DateTime<Utc>,
    },
}

impl TickerEvent {
    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            TickerEvent::PriceUpdated { .. } => "PRICE_UPDATED",
            TickerEvent::FetchFailed { .. } => "FETCH_FAILED",
        }
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Overall component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// A fresh reading is available
    Healthy,
    /// Only a stale reading is available
    Degraded,
    /// No reading has ever been accepted
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
