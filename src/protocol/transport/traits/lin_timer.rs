//! Asynchronous timer abstraction bounding the blocking transfer waits.
use embassy_time::Duration;

/// Delay source raced against transfer completion.
pub trait LinTimer {
    /// Resolve once `duration` has elapsed.
    fn delay<'a>(&'a mut self, duration: Duration) -> impl core::future::Future<Output = ()> + 'a;
}
