//! LIN frame codecs: protected-identifier parity and checksum arithmetic.
pub mod checksum;
pub mod pid;
