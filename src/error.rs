//! Error types for the ticker

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a single fetch from the price source
///
/// These never reach readers of the ticker; the poller recovers from all of
/// them through backoff.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS or transport failure, or an unexpected HTTP status
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The request exceeded its time bound
    #[error("Request timeout")]
    Timeout,

    /// The body could not be parsed or failed validation
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The source explicitly throttled us
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
}

impl FetchError {
    /// Creates a MalformedResponse error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Short machine-friendly name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NetworkFailure(_) => "network_failure",
            FetchError::Timeout => "timeout",
            FetchError::MalformedResponse(_) => "malformed_response",
            FetchError::RateLimited { .. } => "rate_limited",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::MalformedResponse(err.to_string())
        } else {
            FetchError::NetworkFailure(err.to_string())
        }
    }
}

/// Errors returned to readers that refuse to accept stale data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// No reading has ever been accepted
    #[error("Price data not available for {pair}")]
    Unavailable { pair: String },

    /// The last reading is older than the staleness threshold
    #[error("Price data for {pair} is stale (age: {age:?})")]
    Stale { pair: String, age: Duration },
}

impl ReadError {
    /// Creates an Unavailable error
    pub fn unavailable(pair: impl Into<String>) -> Self {
        Self::Unavailable { pair: pair.into() }
    }

    /// Creates a Stale error
    pub fn stale(pair: impl Into<String>, age: Duration) -> Self {
        Self::Stale {
            pair: pair.into(),
            age,
        }
    }
}

/// Errors from starting the background poller
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollerError {
    /// A poller for this ticker has not exited yet
    #[error("Poller for {pair} is already running")]
    AlreadyRunning { pair: String },
}

/// Configuration defects; fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid currency pair {0:?}")]
    InvalidPair(String),

    #[error("Invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("Missing API key for source {source_name} (set {env})")]
    MissingApiKey {
        source_name: &'static str,
        env: &'static str,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn setting(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field,
            reason: reason.into(),
        }
    }
}
