//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (foreground transfer
//! requests, configuration building, interrupt registry management).
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Status returned by foreground node operations.
///
/// Protocol faults (sync, PID, checksum, readback...) never show up here:
/// they are raised as [`LinEvent`](crate::core::LinEvent)s from interrupt context.
pub enum LinError {
    /// Payload size outside `1..=8`, identifier above `0x3F`, or the node is asleep.
    #[error("Invalid argument")]
    InvalidArgument,
    /// A transfer is already in flight on the bus.
    #[error("Bus busy")]
    Busy,
    /// Blocking wait or tick watchdog expired.
    #[error("Timeout")]
    Timeout,
    /// The node has not been initialised (or was de-initialised).
    #[error("Node not initialized")]
    Uninitialized,
    /// `init` called twice without `deinit`.
    #[error("Node already initialized")]
    AlreadyInitialized,
    /// Operation not available for this node role or configuration.
    #[error("Operation not supported by this node")]
    Unsupported,
    /// The edge interval was neither a break, a wakeup nor a usable sync measurement.
    #[error("Edge measurement rejected")]
    MeasurementRejected,
    /// The transport refused to initialise or to change its baud rate.
    #[error("Transport failure")]
    Transport,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while building a [`LinUserConfig`](crate::protocol::config::LinUserConfig).
pub enum ConfigError {
    /// LIN runs between 1 bit/s and 20 kbit/s.
    #[error("Invalid baud rate: {baud_rate}")]
    InvalidBaudRate { baud_rate: u32 },
    /// Only slaves can discover the bus speed.
    #[error("Autobaud is only available on slave nodes")]
    AutobaudOnMaster,
    /// The classic PID list is full.
    #[error("Too many classic PIDs (capacity {capacity})")]
    TooManyClassicPids { capacity: usize },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised by the interrupt registry.
pub enum RegistryError {
    /// Another node is already bound to this instance number.
    #[error("Instance {instance} already registered")]
    InstanceOccupied { instance: usize },
}
