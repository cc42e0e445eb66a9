//! Approximate clock.
//!
//! A cached "now" that is refreshed by a single background task and read
//! lock-free on every request. Readers see a value that is at most one
//! refresh interval old.

use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Interval at which the refresher samples the system clock.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Timestamp cache accurate to about one refresh interval.
#[derive(Debug)]
pub struct ApproximateClock {
    now: ArcSwap<DateTime<Utc>>,
}

impl ApproximateClock {
    /// Creates a clock holding the current system time.
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Creates a clock pinned to `now` until it is refreshed or set.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: ArcSwap::from_pointee(now),
        }
    }

    /// Creates a clock and starts its refresher on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    #[must_use]
    pub fn start() -> (Arc<Self>, ClockRefresher) {
        let clock = Arc::new(Self::new());
        let refresher = clock.spawn_refresher(REFRESH_INTERVAL);
        (clock, refresher)
    }

    /// Returns the cached time.
    #[inline]
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        **self.now.load()
    }

    /// Returns the cached time as unix seconds, clamped at the epoch.
    #[inline]
    #[must_use]
    pub fn unix_seconds(&self) -> u64 {
        u64::try_from(self.now().timestamp()).unwrap_or(0)
    }

    /// Returns the unix second at which something living for `lifetime`
    /// expires when created now.
    #[must_use]
    pub fn expires_at(&self, lifetime: Duration) -> u64 {
        let lifetime = TimeDelta::from_std(lifetime).unwrap_or(TimeDelta::MAX);
        match self.now().checked_add_signed(lifetime) {
            Some(at) => u64::try_from(at.timestamp()).unwrap_or(0),
            None => u64::MAX,
        }
    }

    /// Samples the system clock and publishes it.
    pub fn refresh(&self) {
        self.set(Utc::now());
    }

    /// Publishes `now` as the current time.
    pub fn set(&self, now: DateTime<Utc>) {
        self.now.store(Arc::new(now));
    }

    /// Moves the cached time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let by = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let now = self.now();
        self.set(now.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC));
    }

    /// Spawns the background task refreshing this clock every `every`.
    ///
    /// The task holds only a weak reference and ends on its own once the
    /// clock is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    #[must_use]
    pub fn spawn_refresher(self: &Arc<Self>, every: Duration) -> ClockRefresher {
        let clock: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(clock) = clock.upgrade() else {
                    debug!("Clock dropped, stopping refresher");
                    return;
                };
                clock.refresh();
            }
        });
        ClockRefresher { handle }
    }
}

impl Default for ApproximateClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the refresher task. Dropping it stops the task.
#[derive(Debug)]
pub struct ClockRefresher {
    handle: JoinHandle<()>,
}

impl ClockRefresher {
    /// Stops the refresher.
    pub fn stop(self) {
        drop(self);
    }

    /// Whether the refresher task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ClockRefresher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
