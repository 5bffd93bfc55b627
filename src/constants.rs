//! Default settings for the ticker
//!
//! Every value here can be overridden through `TickerConfig`; these are the
//! values used when a configuration file leaves a field out.

/// How often to poll the price source when it is healthy (in seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Upper bound for the delay between attempts while failing (in seconds)
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 60;

/// HTTP request timeout when fetching a price (in seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Minimum delay after the source signals rate limiting (in seconds)
pub const DEFAULT_RATE_LIMIT_FLOOR_SECS: u64 = 30;

/// A reading older than this many poll intervals is reported as stale
pub const STALENESS_INTERVAL_MULTIPLIER: u32 = 3;

/// Asset tracked when no pair is configured
pub const DEFAULT_BASE: &str = "BTC";

/// Quote currency used when no pair is configured
pub const DEFAULT_QUOTE: &str = "USD";

/// Coinbase public API base URL
pub const COINBASE_API_URL: &str = "https://api.coinbase.com";

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko API endpoint for simple price queries
pub const COINGECKO_SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";

/// CoinAPI REST base URL
pub const COINAPI_API_URL: &str = "https://rest.coinapi.io";

/// Environment variable holding the CoinAPI key
pub const COINAPI_KEY_ENV: &str = "COINAPI_API_KEY";

/// Capacity of the ticker event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Address the HTTP server listens on by default
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// User agent for HTTP requests
pub const USER_AGENT: &str = concat!("btc-ticker/", env!("CARGO_PKG_VERSION"));
