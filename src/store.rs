//! In-memory ticker state with snapshot publishing
//!
//! The store holds one immutable [`TickerState`] behind an `Arc`. Writers build
//! the next snapshot and swap it in under a short write lock; readers clone the
//! `Arc` under a short read lock. Neither side ever awaits while holding the
//! lock, so readers can never observe a half-written reading.

use crate::types::{Freshness, PriceReading};
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Snapshot of everything the poller knows
#[derive(Debug, Clone, Default)]
pub struct TickerState {
    /// Last accepted reading; absent until the first success
    pub reading: Option<PriceReading>,
    /// When the poller last started a fetch
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Delay the poller is currently waiting out
    pub current_backoff: Duration,
    /// Accepted readings (lifetime)
    pub total_successes: u64,
    /// Failed fetches (lifetime)
    pub total_failures: u64,
}

/// Shared cell holding the latest [`TickerState`]
pub struct TickerStore {
    state: RwLock<Arc<TickerState>>,
    staleness_threshold: Duration,
}

impl TickerStore {
    /// Creates an empty store
    pub fn new(staleness_threshold: Duration) -> Self {
        Self {
            state: RwLock::new(Arc::new(TickerState::default())),
            staleness_threshold,
        }
    }

    pub fn staleness_threshold(&self) -> Duration {
        self.staleness_threshold
    }

    /// Returns the latest published snapshot
    pub fn snapshot(&self) -> Arc<TickerState> {
        // A panicking writer cannot leave a torn snapshot behind, only an old one
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latest reading and its freshness, evaluated now
    pub fn current(&self) -> Option<(PriceReading, Freshness)> {
        self.current_at(Utc::now())
    }

    /// Latest reading and its freshness, evaluated at `now`
    pub fn current_at(&self, now: DateTime<Utc>) -> Option<(PriceReading, Freshness)> {
        let state = self.snapshot();
        let reading = state.reading.as_ref()?;
        let freshness = reading.freshness_at(self.staleness_threshold, now);
        Some((reading.clone(), freshness))
    }

    /// Records the start of a fetch attempt
    pub fn record_attempt(&self, at: DateTime<Utc>) {
        self.update(|state| state.last_attempt_at = Some(at));
    }

    /// Publishes an accepted reading and resets failure tracking
    ///
    /// Returns the reading as stored (its `observed_at` is never earlier than
    /// the previously accepted one) together with the previous value.
    pub fn accept(
        &self,
        reading: PriceReading,
        next_delay: Duration,
    ) -> (PriceReading, Option<f64>) {
        self.update(|state| {
            let reading = match &state.reading {
                Some(prev) if reading.observed_at() < prev.observed_at() => {
                    tracing::debug!(
                        observed_at = %reading.observed_at(),
                        previous = %prev.observed_at(),
                        "Clock moved backwards, clamping observed_at"
                    );
                    reading.with_observed_at(prev.observed_at())
                }
                _ => reading,
            };
            let previous = state.reading.replace(reading.clone()).map(|r| r.value());
            state.consecutive_failures = 0;
            state.current_backoff = next_delay;
            state.total_successes += 1;
            (reading, previous)
        })
    }

    /// Records a failed fetch; the last reading is left untouched
    pub fn record_failure(&self, consecutive_failures: u32, next_delay: Duration) {
        self.update(|state| {
            state.consecutive_failures = consecutive_failures;
            state.current_backoff = next_delay;
            state.total_failures += 1;
        });
    }

    fn update<R>(&self, f: impl FnOnce(&mut TickerState) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = TickerState::clone(&guard);
        let result = f(&mut next);
        *guard = Arc::new(next);
        result
    }
}
