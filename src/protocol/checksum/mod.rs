//! Checksum selection: picks the seed for a frame from the configured PID
//! list, then delegates the arithmetic to the generic primitive.
//!
//! The configured list is the single source of truth:
//! - a PID present in the list seeds the sum with the PID itself;
//! - any other PID seeds the sum with `0`;
//! - the `0xFF` sentinel makes every PID behave as listed.
use crate::infra::codec::checksum::checksum;
use crate::protocol::config::PidList;

/// Seed used for `pid` under the given list.
#[inline]
pub fn checksum_seed(classic_pids: &PidList, pid: u8) -> u8 {
    if classic_pids.covers_all() || classic_pids.contains(pid) {
        pid
    } else {
        0
    }
}

/// Compute the checksum byte of a frame payload transmitted with `pid`.
pub fn compute_checksum(classic_pids: &PidList, pid: u8, buffer: &[u8]) -> u8 {
    checksum(buffer, checksum_seed(classic_pids, pid))
}
