//! `korri-lin` library: a LIN (Local Interconnect Network) master or slave
//! node layered on top of a byte-oriented UART in a `no_std` environment.
//! The crate exposes the infrastructure codecs (protected identifiers,
//! checksums), the protocol engine (frame transfers, interrupt-driven state
//! machine, autobaud) and the traits the host must implement.
#![no_std]
//==================================================================================
/// Core data types shared by the protocol engine and the application
/// (node states, events, transfer status).
pub mod core;
/// Error taxonomy returned by foreground operations and configuration.
pub mod error;
/// Low-level LIN codecs: PID parity and checksum arithmetic.
pub mod infra;
/// LIN protocol implementation: configuration, checksum selection,
/// transport abstraction, node engine and interrupt registry.
pub mod protocol;
//==================================================================================
