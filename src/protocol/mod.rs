//! LIN protocol layer: node configuration, checksum selection, frame timing,
//! the transport abstraction, the node engine and the interrupt registry.
pub mod checksum;
pub mod config;
pub mod node;
pub mod registry;
pub mod timing;
pub mod transport;
