//! Virtual clock used while replaying.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ports::clock::{Clock, SleepFuture};

/// Clock whose sleeps return immediately and advance a virtual time.
///
/// Every requested sleep is kept so callers can inspect the backoff and
/// throttle schedule a run produced.
pub struct VirtualClock {
    start: DateTime<Utc>,
    sleeps: Mutex<Vec<Duration>>,
}

impl VirtualClock {
    /// Creates a virtual clock starting at `start`.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// All sleeps requested so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the sleep log lock is poisoned.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("sleep log lock poisoned").clone()
    }

    fn slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.slept()).unwrap_or(chrono::Duration::MAX);
        self.start
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        self.sleeps
            .lock()
            .expect("sleep log lock poisoned")
            .push(duration);
        Box::pin(std::future::ready(()))
    }
}
