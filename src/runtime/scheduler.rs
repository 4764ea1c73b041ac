//! Wall clock and one-shot timer scheduling.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::{runtime::Handle, task::JoinHandle};

/// Source of "now" used for reminder delays and past-date checks.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Starts the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jumps to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Moves forward by `by`.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Tokio runtime handle plus clock; reminder timers run as tasks on this runtime.
#[derive(Clone)]
pub struct Scheduler {
    runtime: Handle,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    /// Builds a scheduler on an explicit runtime and clock.
    pub fn new(runtime: Handle, clock: Arc<dyn Clock>) -> Self {
        Self { runtime, clock }
    }

    /// Uses the ambient runtime and the system clock.
    ///
    /// Panics when called outside a tokio runtime context.
    pub fn current() -> Self {
        Self::new(Handle::current(), Arc::new(SystemClock))
    }

    /// Uses the ambient runtime with a custom clock.
    pub fn current_with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::new(Handle::current(), clock)
    }

    /// Current instant according to the scheduler's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Runs `fire` on a runtime worker once `delay` has elapsed.
    pub fn spawn_after<F>(&self, delay: Duration, fire: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        })
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}
