//! Configuration for the ticker and the process around it
//!
//! Every field has a default from [`crate::constants`], so an empty file (or
//! no file at all) yields a working BTC/USD ticker polling Coinbase.

use crate::{
    constants::{
        COINAPI_API_URL, COINAPI_KEY_ENV, COINBASE_API_URL, COINGECKO_API_URL,
        DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LISTEN_ADDR, DEFAULT_MAX_BACKOFF_SECS,
        DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RATE_LIMIT_FLOOR_SECS, STALENESS_INTERVAL_MULTIPLIER,
    },
    error::ConfigError,
    fetcher::PriceFetcher,
    fetchers::{CoinApiFetcher, CoinGeckoFetcher, CoinbaseFetcher, FailoverFetcher},
    types::CurrencyPair,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Which external source the fetcher talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Coinbase,
    CoinGecko,
    CoinApi,
    /// Coinbase first, CoinGecko as backup
    Failover,
}

impl SourceKind {
    /// Base URL used when no endpoint is configured
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            SourceKind::Coinbase | SourceKind::Failover => COINBASE_API_URL,
            SourceKind::CoinGecko => COINGECKO_API_URL,
            SourceKind::CoinApi => COINAPI_API_URL,
        }
    }
}

/// Settings consumed by the ticker core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    pub source: SourceKind,

    /// Overrides the source's default base URL
    pub endpoint: Option<String>,

    pub pair: CurrencyPair,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    #[serde(rename = "poll_interval_secs", with = "duration_secs")]
    pub poll_interval: Duration,

    #[serde(rename = "max_backoff_secs", with = "duration_secs")]
    pub max_backoff: Duration,

    #[serde(rename = "fetch_timeout_secs", with = "duration_secs")]
    pub fetch_timeout: Duration,

    #[serde(rename = "rate_limit_floor_secs", with = "duration_secs")]
    pub rate_limit_floor: Duration,

    /// Defaults to a multiple of the poll interval
    #[serde(rename = "staleness_threshold_secs", with = "option_duration_secs")]
    pub staleness_threshold: Option<Duration>,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            endpoint: None,
            pair: CurrencyPair::default(),
            api_key: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_backoff: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            rate_limit_floor: Duration::from_secs(DEFAULT_RATE_LIMIT_FLOOR_SECS),
            staleness_threshold: None,
        }
    }
}

impl TickerConfig {
    /// Effective base URL of the source
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.source.default_endpoint())
    }

    /// Effective staleness threshold
    pub fn staleness_threshold(&self) -> Duration {
        self.staleness_threshold.unwrap_or_else(|| {
            self.poll_interval
                .checked_mul(STALENESS_INTERVAL_MULTIPLIER)
                .unwrap_or(Duration::MAX)
        })
    }

    /// Checks the configuration for defects that must stop startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_intervals()?;
        validate_endpoint(self.endpoint())?;

        if self.source == SourceKind::CoinApi
            && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(ConfigError::MissingApiKey {
                source_name: "coinapi",
                env: COINAPI_KEY_ENV,
            });
        }

        Ok(())
    }

    /// Checks only the timing settings
    pub fn validate_intervals(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::setting("poll_interval_secs", "must be positive"));
        }
        if self.staleness_threshold.is_none()
            && self
                .poll_interval
                .checked_mul(STALENESS_INTERVAL_MULTIPLIER)
                .is_none()
        {
            return Err(ConfigError::setting(
                "poll_interval_secs",
                "too large to derive a staleness threshold",
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::setting("fetch_timeout_secs", "must be positive"));
        }
        if self.max_backoff < self.poll_interval {
            return Err(ConfigError::setting(
                "max_backoff_secs",
                "must not be shorter than poll_interval_secs",
            ));
        }
        if self.rate_limit_floor > self.max_backoff {
            return Err(ConfigError::setting(
                "rate_limit_floor_secs",
                "must not exceed max_backoff_secs",
            ));
        }
        if self.staleness_threshold.is_some_and(|s| s.is_zero()) {
            return Err(ConfigError::setting(
                "staleness_threshold_secs",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Validates the configuration and builds the configured fetcher
    pub fn build_fetcher(&self) -> Result<Arc<dyn PriceFetcher>, ConfigError> {
        self.validate()?;

        let endpoint = self.endpoint();
        let pair = self.pair.clone();
        let timeout = self.fetch_timeout;

        let fetcher: Arc<dyn PriceFetcher> = match self.source {
            SourceKind::Coinbase => Arc::new(CoinbaseFetcher::new(endpoint, pair, timeout)?),
            SourceKind::CoinGecko => Arc::new(CoinGeckoFetcher::new(endpoint, pair, timeout)?),
            SourceKind::CoinApi => Arc::new(CoinApiFetcher::new(
                endpoint,
                self.api_key.clone().unwrap_or_default(),
                pair,
                timeout,
            )?),
            SourceKind::Failover => {
                // Both attempts must fit inside the poller's fetch timeout
                let per_source = timeout / 2;
                let primary: Arc<dyn PriceFetcher> =
                    Arc::new(CoinbaseFetcher::new(endpoint, pair.clone(), per_source)?);
                let backup: Arc<dyn PriceFetcher> =
                    Arc::new(CoinGeckoFetcher::new(COINGECKO_API_URL, pair, per_source)?);
                Arc::new(FailoverFetcher::new(vec![primary, backup]))
            }
        };

        Ok(fetcher)
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(())
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::setting("listen_addr", e.to_string()))
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ticker: TickerConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Loads the configuration file; a missing file yields defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Fills the API key from the environment when the file left it out
    pub fn with_env_api_key(mut self, key: Option<String>) -> Self {
        if self.ticker.api_key.is_none() {
            self.ticker.api_key = key.filter(|k| !k.trim().is_empty());
        }
        self
    }

    /// Applies `COINAPI_API_KEY` from the process environment
    pub fn apply_env(self) -> Self {
        let key = std::env::var(COINAPI_KEY_ENV).ok();
        self.with_env_api_key(key)
    }
}

mod duration_secs {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

mod option_duration_secs {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(d)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(D::Error::custom))
            .transpose()
    }
}
