//! Abstraction traits used by the node engine (UART transport, delay timer
//! for blocking waits, edge-interval timer for autobaud and wakeup).
pub mod edge_timer;
pub mod lin_timer;
pub mod lin_uart;
