//! LIN transport layer: the UART abstraction the node engine drives, the
//! timer abstractions used for blocking waits and edge measurement, and the
//! bus timing constants.
//!
//! ## LIN Timing Constants
//!
//! These constants define the break-detection and autobaud thresholds the
//! engine applies on top of the raw transport.

pub mod traits;

/// Default period of the timeout service tick (µs).
///
/// `timeout_service` is expected to run once per tick; the frame timing
/// helpers in [`protocol::timing`](crate::protocol::timing) express their
/// results in ticks of this length unless told otherwise.
pub const TIMEOUT_TICK_US: u32 = 500;

/// Shortest low period accepted as a break while autobaud is running (µs).
///
/// The bus speed is still unknown at that point, so the threshold is the
/// slave break-detection minimum (11 nominal bits) at the fastest rate
/// the engine can lock onto, 19200 bit/s:
///
/// - 11 × 52.08 µs ≈ 572 µs
///
/// Any slower bus produces a longer break and passes the threshold.
pub const AUTOBAUD_BREAK_MIN_US: u32 = 11 * 1_000_000 / 19_200;

/// Baud rates autobaud can lock onto, matched in this order.
pub const AUTOBAUD_RATES: [u32; 5] = [19_200, 14_400, 9_600, 4_800, 2_400];

/// Half-width of each autobaud band around its nominal two-bit time (%).
pub const AUTOBAUD_BAND_TOLERANCE_PCT: u32 = 10;

/// Allowed drift between two consecutive two-bit measurements (%).
///
/// Unsynchronised slave clocks may deviate by ±14 % per the LIN
/// physical layer, so consecutive measurements are compared with that
/// wider tolerance.
pub const AUTOBAUD_UNSYNC_TOLERANCE_PCT: u32 = 14;

/// Two-bit measurements required before a rate is accepted (five falling edges).
pub const AUTOBAUD_REQUIRED_MEASUREMENTS: u8 = 4;

/// Edges to let pass after lock before the transport paths are enabled.
pub const AUTOBAUD_SETTLE_EDGES: u8 = 5;

/// Bus speed above which a single `0x80` byte carries the wakeup pulse.
///
/// Below it, `0xF8` keeps the dominant part of the byte (start bit plus
/// three zero bits) inside the 250 µs – 5 ms wakeup window.
pub const WAKEUP_BYTE_BAUD_THRESHOLD: u32 = 10_000;

/// Byte transmitted to produce a wakeup pulse at `baud_rate`.
#[inline]
pub const fn wakeup_byte(baud_rate: u32) -> u8 {
    if baud_rate > WAKEUP_BYTE_BAUD_THRESHOLD {
        0x80
    } else {
        0xF8
    }
}
