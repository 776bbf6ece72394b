//! Edge-interval measurement used by autobaud and by the sleep-mode wakeup
//! detector.

/// Source of the time elapsed between two consecutive bus edges.
///
/// Typically backed by a free-running hardware timer sampled from the
/// edge interrupt. Only called from interrupt context.
pub trait EdgeTimer {
    /// Microseconds elapsed since the previous call.
    fn elapsed_us(&mut self) -> u32;
}
