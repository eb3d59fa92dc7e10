//! Wall-clock and sleep capability.
//!
//! The pacing loop only ever needs monotonic elapsed time and a blocking
//! sleep, so both sit behind [`Clock`]. Production code uses [`SystemClock`];
//! tests drive the lag-wait loops on a virtual timeline instead of real
//! sleeps.

use std::time::{Duration, Instant};

/// Monotonic time and blocking sleep, as consumed by the pacing loop.
///
/// Sleeps intentionally block the calling thread for their full duration,
/// that is the backpressure mechanism of the whole crate.
pub trait Clock: Send + Sync {
    /// Current monotonic time.
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by [`Instant::now`] and [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
