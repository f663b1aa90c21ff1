//! Clock port for obtaining the current time and suspending.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Boxed future returned by [`Clock::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Provides the current time and a way to wait.
///
/// Abstracting time access lets tests and cassette playback run the
/// retry backoff and the inter-file throttle without actually waiting.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspends the current task for `duration`.
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}
