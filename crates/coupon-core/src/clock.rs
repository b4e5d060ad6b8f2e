//! A test seam for time
//!
//! Code that needs "now" or "sleep for a bit" takes `&dyn Clock` instead of
//! calling `chrono`/`tokio::time` directly, so deadline and TTL behavior can
//! be driven deterministically from tests.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of wall-clock time and sleeps, abstracted for testability.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;

    /// Sleep for `duration`, returning a boxed future so the trait stays
    /// object-safe.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Real-clock implementation backed by `chrono::Utc` and `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn Clock) {}

    #[tokio::test]
    async fn system_clock_now_is_monotonic_non_decreasing() {
        let clock = SystemClock;
        let a = clock.now();
        clock.sleep(Duration::from_millis(1)).await;
        let b = clock.now();
        assert!(b >= a);
    }
}
