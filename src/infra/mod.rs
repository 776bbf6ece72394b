//! Infrastructure layer: byte-level LIN codecs with no knowledge of node
//! state or configuration.
pub mod codec;
