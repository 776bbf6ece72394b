//! Data types shared between the interrupt-context engine and the
//! foreground API: protocol states, the closed event set delivered to the
//! user callback, and the status reported by transfer polling.

/// Maximum number of payload bytes carried by a LIN frame.
pub const MAX_FRAME_DATA: usize = 8;

/// Sync field transmitted after every break.
pub const SYNC_BYTE: u8 = 0x55;

/// Largest 6-bit frame identifier.
pub const MAX_FRAME_ID: u8 = 0x3F;

/// Minimum dominant pulse accepted as a wakeup signal (µs).
pub const WAKEUP_PULSE_MIN_US: u32 = 150;

//==================================================================================NODE_ROLE
/// Role of the node on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeRole {
    /// Owns the schedule: emits break, sync and PID.
    Master,
    /// Answers or listens to headers emitted by the master.
    Slave,
}

//==================================================================================NODE_STATE
/// Protocol state of a node.
///
/// ```text
/// UNINIT -> IDLE <-> { SEND_BREAK_FIELD -> SEND_PID, RECV_SYNC } -> RECV_PID
///        -> { SEND_DATA | RECV_DATA } -> { SEND_DATA_COMPLETED | RECV_DATA_COMPLETED } -> IDLE
/// IDLE <-> SLEEP_MODE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeState {
    Uninit,
    SleepMode,
    Idle,
    SendBreakField,
    RecvSync,
    SendPid,
    RecvPid,
    SendData,
    SendDataCompleted,
    RecvData,
    RecvDataCompleted,
}

//==================================================================================LIN_EVENT
/// Last significant protocol event, delivered to the user callback.
///
/// Faults are reported here only. The interrupt path has no caller to
/// return a status to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinEvent {
    NoEvent,
    /// A dominant pulse long enough to be a wakeup was measured while asleep.
    WakeupSignal,
    /// Autobaud locked onto a bus speed.
    BaudrateAdjusted,
    /// Slave detected a break field.
    RecvBreakFieldOk,
    SyncOk,
    SyncError,
    /// Header complete: the PID was echoed (master) or has valid parity (slave).
    PidOk,
    PidError,
    /// Framing error on the current byte.
    FrameError,
    /// The byte read back from the bus differs from the byte transmitted.
    ReadbackError,
    ChecksumError,
    TxCompleted,
    RxCompleted,
    /// Receiver overrun. Advisory, no state change.
    RxOverrun,
    /// A non-blocking transfer ran out of timeout ticks.
    TimeoutError,
}

//==================================================================================TRANSFER
/// Direction of an in-flight data transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Tx,
    Rx,
}

/// Whether the foreground waits for completion or polls for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    Blocking,
    NonBlocking,
}

/// The single transfer a node may have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transfer {
    pub direction: Direction,
    pub mode: TransferMode,
}

impl Transfer {
    #[inline]
    pub const fn is_blocking(&self) -> bool {
        matches!(self.mode, TransferMode::Blocking)
    }
}

/// Outcome reported by transfer polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferStatus {
    Busy,
    Timeout,
    Success,
}

/// Result of `transmit_status` / `receive_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferProgress {
    pub status: TransferStatus,
    /// Bytes still to transfer, checksum included.
    pub bytes_remaining: u8,
}
