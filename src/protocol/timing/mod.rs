//! Frame timing helpers converting the LIN maximum frame durations into
//! timeout-service ticks, ready for `set_timeout_counter`.
//!
//! # LIN 2.x frame budget
//!
//! ```text
//! T_header_max   = 1.4 × 34 bit times             (break + sync + PID)
//! T_response_max = 1.4 × 10 × (N + 1) bit times   (N data bytes + checksum)
//! ```
use crate::core::MAX_FRAME_DATA;

/// Nominal header length in bit times.
const HEADER_BITS: u64 = 34;
/// Bits per byte on the wire (start + 8 data + stop).
const BYTE_BITS: u64 = 10;

/// Ticks covering the longest legal header at `baud_rate`.
///
/// Rounded up so the watchdog never fires before the limit.
pub fn max_header_timeout_ticks(baud_rate: u32, tick_us: u32) -> u32 {
    // 1.4 expressed as 14 / 10
    let duration_us = (HEADER_BITS * 14 * 1_000_000).div_ceil(10 * baud_rate.max(1) as u64);
    to_ticks(duration_us, tick_us)
}

/// Ticks covering the longest legal response carrying `size` data bytes.
///
/// `size` is clamped to the LIN maximum of eight bytes.
pub fn max_response_timeout_ticks(baud_rate: u32, size: usize, tick_us: u32) -> u32 {
    let bytes = size.min(MAX_FRAME_DATA) as u64 + 1;
    let duration_us = (BYTE_BITS * bytes * 14 * 1_000_000).div_ceil(10 * baud_rate.max(1) as u64);
    to_ticks(duration_us, tick_us)
}

fn to_ticks(duration_us: u64, tick_us: u32) -> u32 {
    duration_us.div_ceil(tick_us.max(1) as u64) as u32
}
