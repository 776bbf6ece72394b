//! Generic LIN checksum primitive: 8-bit sum with carry folding, inverted.
//!
//! The classic and enhanced variants only differ by the seed the caller
//! provides (see [`protocol::checksum`](crate::protocol::checksum)).

/// Compute the checksum byte of `buffer`, starting the sum at `seed`.
///
/// Each addition that overflows 8 bits wraps the carry back into bit 0
/// before the final inversion.
pub fn checksum(buffer: &[u8], seed: u8) -> u8 {
    let sum = buffer.iter().fold(seed as u16, |acc, &byte| {
        let acc = acc + byte as u16;
        if acc > 0xFF {
            acc - 0xFF
        } else {
            acc
        }
    });

    !(sum as u8)
}
