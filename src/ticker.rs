//! Ticker service: background poller plus the always-available read path
//!
//! ```text
//! Ticker::spawn()
//!     ↓
//! Poller task (fetch → publish or back off → sleep)
//!     ↓
//! PriceFetcher (Coinbase, CoinGecko, CoinAPI, failover)
//!     ↓
//! TickerStore (snapshot swap)
//!     ↓
//! Readers (current, fresh_price, health_check)
//! ```

use crate::{
    backoff::Backoff,
    config::TickerConfig,
    constants::EVENT_CHANNEL_CAPACITY,
    error::{ConfigError, FetchError, PollerError, ReadError},
    fetcher::PriceFetcher,
    metrics::{FetchMetrics, MetricsCollector},
    store::{TickerState, TickerStore},
    types::{ComponentHealth, CurrencyPair, Freshness, HealthStatus, PriceReading, TickerEvent},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, Mutex, Notify};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::sleep;
use uuid::Uuid;

/// State shared between the ticker, its poller task and `refresh_now`
struct Shared {
    store: Arc<TickerStore>,
    fetcher: Arc<dyn PriceFetcher>,
    metrics: MetricsCollector,
    events: broadcast::Sender<TickerEvent>,
    /// Held for the whole fetch-and-publish step, so fetches never overlap
    backoff: Mutex<Backoff>,
    fetch_timeout: Duration,
    pair: CurrencyPair,
    /// Set while a poller task exists
    running: AtomicBool,
    /// Signalled after `refresh_now` changed the schedule
    rescheduled: Notify,
}

impl Shared {
    /// Runs one fetch and publishes its outcome
    ///
    /// Returns the outcome together with the delay before the next attempt.
    async fn fetch_once(&self) -> (Result<PriceReading, FetchError>, Duration) {
        let mut backoff = self.backoff.lock().await;
        self.store.record_attempt(Utc::now());

        let start = Instant::now();
        let outcome = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout),
        };
        let latency = start.elapsed();

        match outcome {
            Ok(reading) => {
                let delay = backoff.on_success();
                let (stored, old_value) = self.store.accept(reading, delay);
                drop(backoff);

                tracing::debug!(
                    pair = %stored.pair(),
                    value = stored.value(),
                    source = stored.source(),
                    latency_ms = latency.as_millis() as u64,
                    "Accepted price reading"
                );
                self.metrics.record_fetch(latency, Ok(())).await;
                let _ = self.events.send(TickerEvent::PriceUpdated {
                    id: Uuid::new_v4(),
                    pair: stored.pair().clone(),
                    old_value,
                    new_value: stored.value(),
                    source: stored.source().to_string(),
                    timestamp: stored.observed_at(),
                });

                (Ok(stored), delay)
            }
            Err(err) => {
                let delay = backoff.on_failure(&err);
                let failures = backoff.consecutive_failures();
                self.store.record_failure(failures, delay);
                drop(backoff);

                tracing::warn!(
                    source = self.fetcher.source_name(),
                    error = %err,
                    consecutive_failures = failures,
                    retry_in_ms = delay.as_millis() as u64,
                    "Failed to fetch price, backing off"
                );
                self.metrics.record_fetch(latency, Err(&err)).await;
                let _ = self.events.send(TickerEvent::FetchFailed {
                    id: Uuid::new_v4(),
                    pair: self.pair.clone(),
                    error_kind: err.kind(),
                    error_message: err.to_string(),
                    consecutive_failures: failures,
                    retry_in: delay,
                    timestamp: Utc::now(),
                });

                (Err(err), delay)
            }
        }
    }
}

/// Price ticker
///
/// Owns the shared state cell and the fetcher. Nothing runs until
/// [`Ticker::spawn`] starts the poller.
///
/// # Example
/// ```no_run
/// use btc_ticker::{Ticker, TickerConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let ticker = Ticker::new(TickerConfig::default())?;
/// let poller = ticker.spawn()?;
///
/// match ticker.current() {
///     Some((reading, freshness)) => println!("{}: {:.2} ({:?})", reading.pair(), reading.value(), freshness),
///     None => println!("no price yet"),
/// }
///
/// poller.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct Ticker {
    shared: Arc<Shared>,
    config: TickerConfig,
}

impl Ticker {
    /// Creates a ticker using the source named in the configuration
    ///
    /// Fails fast on configuration defects such as a malformed endpoint.
    pub fn new(config: TickerConfig) -> Result<Self, ConfigError> {
        let fetcher = config.build_fetcher()?;
        Self::with_fetcher(config, fetcher)
    }

    /// Creates a ticker with a custom fetcher
    ///
    /// Only the timing settings of `config` are validated; the source fields
    /// are ignored.
    pub fn with_fetcher(
        config: TickerConfig,
        fetcher: Arc<dyn PriceFetcher>,
    ) -> Result<Self, ConfigError> {
        config.validate_intervals()?;

        let store = Arc::new(TickerStore::new(config.staleness_threshold()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            store,
            metrics: MetricsCollector::new(fetcher.source_name()),
            fetcher,
            events,
            backoff: Mutex::new(Backoff::new(
                config.poll_interval,
                config.max_backoff,
                config.rate_limit_floor,
            )),
            fetch_timeout: config.fetch_timeout,
            pair: config.pair.clone(),
            running: AtomicBool::new(false),
            rescheduled: Notify::new(),
        });

        Ok(Self { shared, config })
    }

    /// Starts the background poller
    ///
    /// The first fetch starts immediately. The poller runs until
    /// [`PollerHandle::shutdown`] is called or the handle is dropped. Only one
    /// poller may run per ticker; a new one can be spawned once the previous
    /// one has exited.
    pub fn spawn(&self) -> Result<PollerHandle, PollerError> {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Err(PollerError::AlreadyRunning {
                pair: self.shared.pair.to_string(),
            });
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let shared = self.shared.clone();

        tracing::info!(
            source = shared.fetcher.source_name(),
            pair = %shared.pair,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_backoff_ms = self.config.max_backoff.as_millis() as u64,
            "Starting ticker poller"
        );

        let join = tokio::spawn(run_poller(RunningGuard(shared), stop_rx));
        Ok(PollerHandle { stop_tx, join })
    }

    /// Latest reading and its freshness
    ///
    /// Returns `None` until the first successful fetch. Never waits on the
    /// network, even while a fetch is in flight.
    pub fn current(&self) -> Option<(PriceReading, Freshness)> {
        self.shared.store.current()
    }

    /// [`Ticker::current`] evaluated at an explicit time
    pub fn current_at(&self, now: DateTime<Utc>) -> Option<(PriceReading, Freshness)> {
        self.shared.store.current_at(now)
    }

    /// Latest reading, refusing stale data
    pub fn fresh_price(&self) -> Result<PriceReading, ReadError> {
        self.reader().fresh_price()
    }

    /// Full snapshot of the poller's state
    pub fn state(&self) -> Arc<TickerState> {
        self.shared.store.snapshot()
    }

    /// Cheap, cloneable read-only view for request handlers
    pub fn reader(&self) -> TickerReader {
        TickerReader {
            store: self.shared.store.clone(),
            pair: self.shared.pair.clone(),
        }
    }

    /// Subscribes to price updates and fetch failures
    pub fn subscribe(&self) -> broadcast::Receiver<TickerEvent> {
        self.shared.events.subscribe()
    }

    /// Forces an immediate fetch
    ///
    /// Waits for any in-flight poller fetch first. On success the reading is
    /// published exactly as a poll would; on failure the backoff state
    /// advances. A sleeping poller restarts its wait with the new delay.
    pub async fn refresh_now(&self) -> Result<PriceReading, FetchError> {
        let (outcome, _) = self.shared.fetch_once().await;
        self.shared.rescheduled.notify_one();
        outcome
    }

    /// Gets fetch metrics including latency percentiles and success rates
    pub async fn fetch_metrics(&self) -> FetchMetrics {
        self.shared.metrics.get_metrics().await
    }

    pub fn source_name(&self) -> &'static str {
        self.shared.fetcher.source_name()
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.shared.pair
    }

    /// Perform a health check on the ticker
    pub async fn health_check(&self) -> ComponentHealth {
        self.reader().health_check(self.source_name())
    }
}

/// Read-only handle onto the ticker's state
#[derive(Clone)]
pub struct TickerReader {
    store: Arc<TickerStore>,
    pair: CurrencyPair,
}

impl TickerReader {
    pub fn current(&self) -> Option<(PriceReading, Freshness)> {
        self.store.current()
    }

    pub fn current_at(&self, now: DateTime<Utc>) -> Option<(PriceReading, Freshness)> {
        self.store.current_at(now)
    }

    pub fn state(&self) -> Arc<TickerState> {
        self.store.snapshot()
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    pub fn staleness_threshold(&self) -> Duration {
        self.store.staleness_threshold()
    }

    /// Latest reading, refusing stale data
    pub fn fresh_price(&self) -> Result<PriceReading, ReadError> {
        self.fresh_price_at(Utc::now())
    }

    pub fn fresh_price_at(&self, now: DateTime<Utc>) -> Result<PriceReading, ReadError> {
        match self.store.current_at(now) {
            None => Err(ReadError::unavailable(self.pair.to_string())),
            Some((reading, Freshness::Stale)) => Err(ReadError::stale(
                self.pair.to_string(),
                reading.age_at(now),
            )),
            Some((reading, Freshness::Fresh)) => Ok(reading),
        }
    }

    /// Summarizes availability and freshness as a component health report
    pub fn health_check(&self, source_name: &str) -> ComponentHealth {
        let now = Utc::now();
        let state = self.store.snapshot();
        let mut details = HashMap::new();

        details.insert("pair".to_string(), serde_json::json!(self.pair.to_string()));
        details.insert("source".to_string(), serde_json::json!(source_name));
        details.insert(
            "consecutive_failures".to_string(),
            serde_json::json!(state.consecutive_failures),
        );
        details.insert(
            "current_backoff_ms".to_string(),
            serde_json::json!(state.current_backoff.as_millis() as u64),
        );
        if let Some(at) = state.last_attempt_at {
            details.insert("last_attempt_at".to_string(), serde_json::json!(at));
        }

        let freshness = state.reading.as_ref().map(|reading| {
            details.insert(
                "age_secs".to_string(),
                serde_json::json!(reading.age_at(now).as_secs_f64()),
            );
            reading.freshness_at(self.store.staleness_threshold(), now)
        });

        let (status, message) = match freshness {
            Some(Freshness::Fresh) => (
                HealthStatus::Healthy,
                "Ticker is operational with fresh data".to_string(),
            ),
            Some(Freshness::Stale) => (
                HealthStatus::Degraded,
                format!(
                    "Ticker is serving stale data after {} consecutive failures",
                    state.consecutive_failures
                ),
            ),
            None => (
                HealthStatus::Unhealthy,
                "Ticker has no price data yet".to_string(),
            ),
        };

        ComponentHealth {
            name: "ticker".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: now,
        }
    }
}

/// Handle to the running poller
///
/// Dropping the handle also stops the poller.
#[derive(Debug)]
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    /// Signals the poller to stop and waits for it to exit
    ///
    /// An in-flight fetch is abandoned without publishing anything.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        let _ = self.stop_tx.send(true);
        self.join.await
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Owns the poller's shared state and clears the running flag when the task
/// ends or is dropped, even before its first poll
struct RunningGuard(Arc<Shared>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
    }
}

async fn run_poller(guard: RunningGuard, mut stop: watch::Receiver<bool>) {
    let shared = &guard.0;

    'poll: loop {
        let mut delay = tokio::select! {
            biased;
            _ = stopped(&mut stop) => break 'poll,
            (_, delay) = shared.fetch_once() => delay,
        };

        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut stop) => break 'poll,
                // A manual refresh just ran; wait out the delay it scheduled
                _ = shared.rescheduled.notified() => {
                    delay = shared.store.snapshot().current_backoff;
                }
                _ = sleep(delay) => break,
            }
        }
    }

    tracing::info!(pair = %shared.pair, "Ticker poller stopped");
}

/// Resolves once a stop was requested or the handle is gone
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::mock::{ScriptedFetcher, Step};

    fn config(poll: u64, max: u64) -> TickerConfig {
        TickerConfig {
            poll_interval: Duration::from_secs(poll),
            max_backoff: Duration::from_secs(max),
            fetch_timeout: Duration::from_secs(1),
            rate_limit_floor: Duration::from_secs(poll),
            staleness_threshold: None,
            ..TickerConfig::default()
        }
    }

    fn ticker(config: TickerConfig, steps: Vec<Step>) -> (Ticker, Arc<ScriptedFetcher>) {
        let fetcher = Arc::new(ScriptedFetcher::new(steps));
        let ticker = Ticker::with_fetcher(config, fetcher.clone()).unwrap();
        (ticker, fetcher)
    }

    fn network() -> Step {
        Step::Fail(FetchError::NetworkFailure("connection reset".to_string()))
    }

    async fn next_update(rx: &mut broadcast::Receiver<TickerEvent>) -> TickerEvent {
        loop {
            let event = rx.recv().await.unwrap();
            if matches!(event, TickerEvent::PriceUpdated { .. }) {
                return event;
            }
        }
    }

    fn gaps(times: &[tokio::time::Instant]) -> Vec<Duration> {
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    fn assert_close(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual <= expected + Duration::from_millis(5),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_is_fresh() {
        let (ticker, _) = ticker(config(5, 60), vec![Step::Price(50_000.0)]);
        let mut events = ticker.subscribe();
        assert!(ticker.current().is_none());

        let poller = ticker.spawn().unwrap();
        next_update(&mut events).await;

        let (reading, freshness) = ticker.current().unwrap();
        assert_eq!(reading.value(), 50_000.0);
        assert_eq!(freshness, Freshness::Fresh);
        assert_eq!(ticker.fresh_price().unwrap(), reading);

        poller.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_back_off_exponentially_then_reset() {
        let (ticker, fetcher) = ticker(
            config(2, 30),
            vec![network(), network(), network(), Step::Price(50_000.0), network()],
        );
        let mut events = ticker.subscribe();
        let poller = ticker.spawn().unwrap();

        next_update(&mut events).await;
        assert_eq!(ticker.state().current_backoff, Duration::from_secs(2));
        assert_eq!(ticker.state().consecutive_failures, 0);

        fetcher.wait_for_calls(5).await;
        poller.shutdown().await.unwrap();

        let gaps = gaps(&fetcher.call_times());
        assert_close(gaps[0], Duration::from_secs(4));
        assert_close(gaps[1], Duration::from_secs(8));
        assert_close(gaps[2], Duration::from_secs(16));
        // Back to the base interval after the success
        assert_close(gaps[3], Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_state_is_published() {
        let (ticker, fetcher) = ticker(config(2, 30), vec![network()]);
        let poller = ticker.spawn().unwrap();

        fetcher.wait_for_calls(4).await;
        // The fourth failure is still being recorded; check the third
        let state = ticker.state();
        assert!(state.consecutive_failures >= 3);
        assert!(state.current_backoff >= Duration::from_secs(16));
        assert!(state.last_attempt_at.is_some());
        assert!(ticker.current().is_none());

        poller.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_succeeding_source_stays_unavailable() {
        let (ticker, fetcher) = ticker(config(1, 8), vec![Step::Fail(FetchError::Timeout)]);
        let poller = ticker.spawn().unwrap();

        fetcher.wait_for_calls(10).await;
        assert!(ticker.current().is_none());
        assert_eq!(
            ticker.fresh_price().unwrap_err(),
            ReadError::unavailable("BTC/USD")
        );
        assert_eq!(
            ticker.health_check().await.status,
            HealthStatus::Unhealthy
        );

        poller.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_survives_later_failures() {
        let (ticker, fetcher) = ticker(
            config(1, 4),
            vec![
                Step::Price(50_000.0),
                network(),
                Step::Fail(FetchError::malformed("bad body")),
                Step::Fail(FetchError::RateLimited { retry_after: None }),
                Step::Fail(FetchError::Timeout),
            ],
        );
        let poller = ticker.spawn().unwrap();

        fetcher.wait_for_calls(8).await;
        let first = ticker.current().unwrap();
        let second = ticker.current().unwrap();
        assert_eq!(first.0.value(), 50_000.0);
        assert_eq!(first, second);

        poller.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_fetch_times_out_and_backs_off() {
        let (ticker, fetcher) = ticker(config(2, 30), vec![Step::Hang, Step::Price(1.0)]);
        let mut events = ticker.subscribe();
        let poller = ticker.spawn().unwrap();

        match events.recv().await.unwrap() {
            TickerEvent::FetchFailed {
                error_kind,
                retry_in,
                ..
            } => {
                assert_eq!(error_kind, "timeout");
                assert_eq!(retry_in, Duration::from_secs(4));
            }
            other => panic!("unexpected event {other:?}"),
        }

        next_update(&mut events).await;
        // 1s timeout followed by a 4s backoff
        assert_close(gaps(&fetcher.call_times())[0], Duration::from_secs(5));
        assert_eq!(ticker.fetch_metrics().await.failures_by_kind["timeout"], 1);

        poller.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_delays_next_tick_instead_of_overlapping() {
        let mut config = config(2, 30);
        config.fetch_timeout = Duration::from_secs(20);
        let (ticker, fetcher) = ticker(config, vec![Step::Slow(Duration::from_secs(7), 10.0)]);
        let poller = ticker.spawn().unwrap();

        fetcher.wait_for_calls(3).await;
        poller.shutdown().await.unwrap();

        for gap in gaps(&fetcher.call_times()) {
            assert_close(gap, Duration::from_secs(9));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_in_flight_fetch() {
        let mut config = config(5, 60);
        config.fetch_timeout = Duration::from_secs(60);
        let (ticker, fetcher) = ticker(config, vec![Step::Hang]);
        let poller = ticker.spawn().unwrap();

        fetcher.wait_for_calls(1).await;
        let start = tokio::time::Instant::now();
        poller.shutdown().await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        let state = ticker.state();
        assert!(state.reading.is_none());
        assert_eq!(state.total_failures, 0);
        assert_eq!(state.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_sleep() {
        let (ticker, fetcher) = ticker(config(300, 600), vec![Step::Price(50_000.0)]);
        let mut events = ticker.subscribe();
        let poller = ticker.spawn().unwrap();
        next_update(&mut events).await;

        let start = tokio::time::Instant::now();
        poller.shutdown().await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(fetcher.call_count(), 1);
        assert!(ticker.current().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_poller() {
        let (ticker, fetcher) = ticker(config(1, 10), vec![Step::Price(1.0)]);
        let poller = ticker.spawn().unwrap();
        fetcher.wait_for_calls(2).await;
        drop(poller);

        let calls = fetcher.call_count();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(fetcher.call_count() <= calls + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_values_are_heartbeats() {
        let (ticker, _) = ticker(config(1, 10), vec![Step::Price(50_000.0)]);
        let mut events = ticker.subscribe();
        let poller = ticker.spawn().unwrap();

        let mut last = None;
        for _ in 0..5 {
            if let TickerEvent::PriceUpdated {
                old_value,
                new_value,
                timestamp,
                ..
            } = next_update(&mut events).await
            {
                assert_eq!(new_value, 50_000.0);
                if let Some(prev) = last {
                    assert_eq!(old_value, Some(50_000.0));
                    assert!(timestamp >= prev);
                }
                last = Some(timestamp);
            }
        }
        assert_eq!(ticker.state().total_successes, 5);
        assert_eq!(ticker.current().unwrap().0.observed_at(), last.unwrap());

        poller.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_poller_per_ticker() {
        let (ticker, fetcher) = ticker(config(300, 600), vec![Step::Price(50_000.0)]);
        let poller = ticker.spawn().unwrap();
        assert_eq!(
            ticker.spawn().unwrap_err(),
            PollerError::AlreadyRunning {
                pair: "BTC/USD".to_string()
            }
        );
        fetcher.wait_for_calls(1).await;
        assert!(!poller.is_finished());
        poller.shutdown().await.unwrap();

        // Once the first poller has exited a new one may start
        let poller = ticker.spawn().unwrap();
        fetcher.wait_for_calls(2).await;
        poller.shutdown().await.unwrap();
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_reschedules_sleeping_poller() {
        let (ticker, fetcher) = ticker(config(2, 30), vec![network(), Step::Price(7.0)]);
        let mut events = ticker.subscribe();
        let poller = ticker.spawn().unwrap();

        // The poller failed once and is now waiting out 4s
        assert!(matches!(
            events.recv().await.unwrap(),
            TickerEvent::FetchFailed { .. }
        ));
        assert_eq!(ticker.state().current_backoff, Duration::from_secs(4));

        ticker.refresh_now().await.unwrap();
        assert_eq!(ticker.state().current_backoff, Duration::from_secs(2));

        fetcher.wait_for_calls(3).await;
        poller.shutdown().await.unwrap();

        // The third call follows the refresh by the base interval, not the old 4s
        let times = fetcher.call_times();
        assert_close(times[2] - times[1], Duration::from_secs(2));
        assert_close(times[2] - times[0], Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_refresh_now_publishes_and_resets() {
        let (ticker, _) = ticker(config(5, 60), vec![network(), Step::Price(42.0)]);

        assert!(ticker.refresh_now().await.is_err());
        assert_eq!(ticker.state().consecutive_failures, 1);

        let reading = ticker.refresh_now().await.unwrap();
        assert_eq!(reading.value(), 42.0);
        assert_eq!(ticker.current().unwrap().0, reading);
        assert_eq!(ticker.state().consecutive_failures, 0);
        assert_eq!(ticker.state().current_backoff, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_stale_reading_and_health() {
        let (ticker, _) = ticker(config(5, 60), vec![Step::Price(50_000.0)]);
        let reading = ticker.refresh_now().await.unwrap();
        let t0 = reading.observed_at();

        let at = |secs| t0 + chrono::Duration::seconds(secs);
        assert_eq!(ticker.current_at(at(1)).unwrap().1, Freshness::Fresh);
        assert_eq!(ticker.current_at(at(20)).unwrap(), (reading.clone(), Freshness::Stale));

        let reader = ticker.reader();
        assert!(matches!(
            reader.fresh_price_at(at(20)),
            Err(ReadError::Stale { age, .. }) if age == Duration::from_secs(20)
        ));
        assert_eq!(reader.fresh_price_at(at(2)).unwrap(), reading);
        assert_eq!(ticker.health_check().await.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_invalid_intervals_fail_fast() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Step::Price(1.0)]));
        let result = Ticker::with_fetcher(config(10, 5), fetcher);
        assert!(matches!(result, Err(ConfigError::InvalidSetting { .. })));
    }
}
