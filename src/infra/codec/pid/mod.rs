//! Protected identifier (PID) handling: a 6-bit frame identifier extended
//! with two parity bits.
//!
//! # Bit layout
//!
//! ```text
//! Bits 0-5 : frame identifier (ID0..ID5)
//! Bit  6   : P0 = ID0 ^ ID1 ^ ID2 ^ ID4
//! Bit  7   : P1 = !(ID1 ^ ID3 ^ ID4 ^ ID5)
//! ```
use crate::core::MAX_FRAME_ID;

/// Compute the protected identifier for a 6-bit frame identifier.
///
/// Bits above the identifier range are ignored.
#[inline]
pub const fn make_parity(id: u8) -> u8 {
    let id = id & MAX_FRAME_ID;

    let p0 = bit(id, 0) ^ bit(id, 1) ^ bit(id, 2) ^ bit(id, 4);
    let p1 = !(bit(id, 1) ^ bit(id, 3) ^ bit(id, 4) ^ bit(id, 5)) & 0x01;

    id | (p0 << 6) | (p1 << 7)
}

#[inline]
const fn bit(value: u8, n: u8) -> u8 {
    (value >> n) & 0x01
}

/// Validate the parity bits of a received PID and recover its identifier.
///
/// Returns `None` when the parity does not match.
#[inline]
pub const fn check_parity(pid: u8) -> Option<u8> {
    let id = pid & MAX_FRAME_ID;
    if make_parity(id) == pid {
        Some(id)
    } else {
        None
    }
}

//==================================================================================PROTECTED_ID
/// Typed wrapper around a raw PID byte as seen on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProtectedId(pub u8);

impl ProtectedId {
    /// Build the PID of a frame identifier (parity bits computed).
    #[inline]
    pub const fn from_id(id: u8) -> Self {
        Self(make_parity(id))
    }

    /// Raw byte transmitted after the sync field.
    #[inline]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Frame identifier, if the parity bits are consistent.
    #[inline]
    pub const fn id(&self) -> Option<u8> {
        check_parity(self.0)
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        check_parity(self.0).is_some()
    }
}
