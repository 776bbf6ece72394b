//! LIN node engine.
//!
//! [`NodeCore`] owns the per-node runtime state and the transport. It holds
//! the frame transfer engine (the non-blocking requests, status polling and
//! the timeout watchdog), the interrupt-context protocol state machine
//! (`state_machine.rs`) and the slave autobaud engine (`autobaud`).
//!
//! [`LinNode`] wraps a `NodeCore` in a blocking mutex so foreground code and
//! the interrupt handler can share it, and adds the blocking transfers that
//! park the caller on a completion signal.
mod autobaud;
mod handle;
mod state_machine;

pub use autobaud::{is_consistent, match_baud_rate, two_bit_time_us};
pub use handle::LinNode;

use crate::core::{
    Direction, LinEvent, NodeRole, NodeState, Transfer, TransferMode, TransferProgress,
    TransferStatus, MAX_FRAME_DATA, MAX_FRAME_ID,
};
use crate::error::LinError;
use crate::infra::codec::pid::make_parity;
use crate::protocol::checksum::compute_checksum;
use crate::protocol::config::{LinUserConfig, DEFAULT_BAUD_RATE};
use crate::protocol::transport::traits::edge_timer::EdgeTimer;
use crate::protocol::transport::traits::lin_uart::{
    BreakDetectWidth, LinUart, StatusFlag, UartInterrupt,
};
use crate::protocol::transport::wakeup_byte;
use autobaud::AutobaudState;

/// User event handler.
///
/// Invoked synchronously from interrupt context with the node lock held.
/// It may start non-blocking transfers through the `NodeCore` it receives,
/// but must neither block nor touch the owning [`LinNode`].
pub type LinCallback<U, E> = fn(&mut NodeCore<U, E>, LinEvent);

/// Progress of the blocking send feeder (see `LinNode::send_blocking`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedOutcome {
    Sent,
    NotReady,
    /// The transfer was aborted or replaced.
    Stopped,
}

//==================================================================================NODE_CORE
/// Runtime state of one LIN node together with its transport.
pub struct NodeCore<U, E> {
    config: LinUserConfig,
    uart: U,
    edge_timer: E,
    callback: Option<LinCallback<U, E>>,

    state: NodeState,
    event: LinEvent,
    current_id: u8,
    current_pid: u8,

    /// Staging copy of the outgoing payload.
    tx_data: [u8; MAX_FRAME_DATA],
    rx_data: [u8; MAX_FRAME_DATA],
    /// Payload length + 1 (checksum slot).
    tx_size: u8,
    rx_size: u8,
    /// Bytes transferred so far, checksum included.
    cnt_byte: u8,
    checksum: u8,
    /// A blocking send saw a readback mismatch; the rest of the frame is ignored.
    readback_fault: bool,

    bus_busy: bool,
    transfer: Option<Transfer>,
    /// Set when a blocking transfer completed and its waiter must be signalled.
    completion_pending: bool,

    timeout_counter: u32,
    timeout_flag: bool,

    baud_rate: u32,
    wakeup_byte: u8,
    autobaud: AutobaudState,
}

impl<U: LinUart, E: EdgeTimer> NodeCore<U, E> {
    /// Bind a configuration, a transport and an edge timer. The node stays
    /// in `Uninit` until [`init`](Self::init).
    pub fn new(config: LinUserConfig, uart: U, edge_timer: E) -> Self {
        Self {
            config,
            uart,
            edge_timer,
            callback: None,
            state: NodeState::Uninit,
            event: LinEvent::NoEvent,
            current_id: 0,
            current_pid: 0,
            tx_data: [0; MAX_FRAME_DATA],
            rx_data: [0; MAX_FRAME_DATA],
            tx_size: 0,
            rx_size: 0,
            cnt_byte: 0,
            checksum: 0,
            readback_fault: false,
            bus_busy: false,
            transfer: None,
            completion_pending: false,
            timeout_counter: 0,
            timeout_flag: false,
            baud_rate: config.baud_rate,
            wakeup_byte: wakeup_byte(config.baud_rate),
            autobaud: AutobaudState::new(false),
        }
    }

    //==================================================================================ACCESSORS
    pub fn config(&self) -> &LinUserConfig {
        &self.config
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Last event raised by the engine.
    pub fn current_event(&self) -> LinEvent {
        self.event
    }

    pub fn current_id(&self) -> u8 {
        self.current_id
    }

    pub fn current_pid(&self) -> u8 {
        self.current_pid
    }

    pub fn is_bus_busy(&self) -> bool {
        self.bus_busy
    }

    pub fn is_tx_busy(&self) -> bool {
        matches!(self.transfer, Some(t) if t.direction == Direction::Tx)
    }

    pub fn is_rx_busy(&self) -> bool {
        matches!(self.transfer, Some(t) if t.direction == Direction::Rx)
    }

    /// The transfer currently outstanding, if any.
    pub fn transfer(&self) -> Option<Transfer> {
        self.transfer
    }

    pub fn timeout_counter(&self) -> u32 {
        self.timeout_counter
    }

    pub fn is_timed_out(&self) -> bool {
        self.timeout_flag
    }

    /// Bus speed currently programmed into the transport.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Byte emitted by [`send_wakeup_signal`](Self::send_wakeup_signal).
    pub fn wakeup_byte(&self) -> u8 {
        self.wakeup_byte
    }

    pub fn transport(&self) -> &U {
        &self.uart
    }

    pub fn transport_mut(&mut self) -> &mut U {
        &mut self.uart
    }

    /// Checksum of `buffer` sent with `pid`, following the configured PID list.
    pub fn compute_checksum(&self, pid: u8, buffer: &[u8]) -> u8 {
        compute_checksum(&self.config.classic_pids, pid, buffer)
    }

    //==================================================================================LIFECYCLE
    /// Initialise the transport and move to `Idle`.
    ///
    /// An autobaud slave starts at 19200 bit/s with the transmit and receive
    /// paths disabled until it has locked onto the bus speed.
    pub fn init(&mut self) -> Result<(), LinError> {
        if self.state != NodeState::Uninit {
            return Err(LinError::AlreadyInitialized);
        }

        let autobaud = self.config.uses_autobaud();
        let baud_rate = if autobaud {
            DEFAULT_BAUD_RATE
        } else {
            self.config.baud_rate
        };

        self.uart.init(baud_rate).map_err(|_err| {
            #[cfg(feature = "defmt")]
            defmt::error!("LIN transport init failed at {} bit/s", baud_rate);
            LinError::Transport
        })?;

        self.baud_rate = baud_rate;
        self.wakeup_byte = wakeup_byte(baud_rate);
        self.autobaud = AutobaudState::new(autobaud);
        self.reset_runtime();
        self.goto_idle();
        self.uart.set_transceiver_enabled(!autobaud);
        self.uart.set_node_interrupt_enabled(true);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "LIN node initialised: role={}, {} bit/s, autobaud={}",
            self.config.role,
            baud_rate,
            autobaud
        );
        Ok(())
    }

    /// Release the transport once the last byte has left the shift register.
    ///
    /// Returns `Ok(false)` while a transmission is still physically in
    /// progress; the caller retries until `Ok(true)`.
    pub fn try_release(&mut self) -> Result<bool, LinError> {
        if self.state == NodeState::Uninit {
            return Err(LinError::Uninitialized);
        }
        if !self.uart.status(StatusFlag::TxComplete) {
            return Ok(false);
        }

        self.uart.set_node_interrupt_enabled(false);
        for source in [
            UartInterrupt::LinBreakDetect,
            UartInterrupt::FrameError,
            UartInterrupt::RxDataFull,
            UartInterrupt::RxActiveEdge,
        ] {
            self.uart.set_interrupt(source, false);
        }
        self.uart.set_transceiver_enabled(false);
        self.uart.deinit();

        self.reset_runtime();
        self.state = NodeState::Uninit;
        Ok(true)
    }

    /// Install or remove the event handler, returning the previous one.
    pub fn install_callback(
        &mut self,
        callback: Option<LinCallback<U, E>>,
    ) -> Option<LinCallback<U, E>> {
        core::mem::replace(&mut self.callback, callback)
    }

    //==================================================================================FRAME_TRANSFER
    /// Start a frame header (break, sync, PID) for identifier `id` (master only).
    pub fn master_send_header(&mut self, id: u8) -> Result<(), LinError> {
        if self.state == NodeState::Uninit {
            return Err(LinError::Uninitialized);
        }
        if self.config.role != NodeRole::Master {
            return Err(LinError::Unsupported);
        }
        if id > MAX_FRAME_ID || self.state == NodeState::SleepMode {
            return Err(LinError::InvalidArgument);
        }
        if self.bus_busy || self.transfer.is_some() {
            return Err(LinError::Busy);
        }

        self.current_id = id;
        self.current_pid = make_parity(id);
        self.event = LinEvent::NoEvent;
        self.state = NodeState::SendBreakField;
        self.bus_busy = true;

        self.uart.set_interrupt(UartInterrupt::LinBreakDetect, true);
        self.uart.queue_break_field();

        #[cfg(feature = "defmt")]
        defmt::debug!("LIN header: id={=u8:#x} pid={=u8:#x}", id, self.current_pid);
        Ok(())
    }

    /// Queue a response and emit its first byte; the interrupt path sends
    /// the rest after reading each byte back.
    ///
    /// The payload is copied into node-owned staging storage, so `data`
    /// does not need to outlive the call.
    pub fn send_non_blocking(&mut self, data: &[u8]) -> Result<(), LinError> {
        self.check_transfer_request(data.len())?;
        self.arm_send(data, TransferMode::NonBlocking);

        let first = self.tx_byte(0);
        self.uart.put_byte(first);
        Ok(())
    }

    /// Arm the reception of `size` payload bytes plus checksum.
    ///
    /// Received bytes are read with [`copy_received`](Self::copy_received)
    /// once [`receive_status`](Self::receive_status) reports success.
    pub fn recv_non_blocking(&mut self, size: usize) -> Result<(), LinError> {
        self.check_transfer_request(size)?;
        self.arm_recv(size, TransferMode::NonBlocking);
        Ok(())
    }

    /// Copy the payload of the last reception into `buffer`, returning the
    /// number of bytes written.
    pub fn copy_received(&self, buffer: &mut [u8]) -> usize {
        let available = (self.rx_size as usize).saturating_sub(1);
        let len = available.min(buffer.len());
        buffer[..len].copy_from_slice(&self.rx_data[..len]);
        len
    }

    pub fn transmit_status(&self) -> TransferProgress {
        self.progress(self.tx_size.saturating_sub(self.cnt_byte))
    }

    pub fn receive_status(&self) -> TransferProgress {
        self.progress(self.rx_size.saturating_sub(self.cnt_byte))
    }

    /// Drop any transfer and force `Idle`.
    ///
    /// Bytes already handed to the transport are not recalled.
    pub fn abort(&mut self) -> Result<(), LinError> {
        if self.state == NodeState::Uninit {
            return Err(LinError::Uninitialized);
        }
        self.transfer = None;
        self.completion_pending = false;
        self.goto_idle();
        Ok(())
    }

    /// Enter sleep mode: only receive-line edges are watched, to catch a
    /// wakeup pulse.
    pub fn go_to_sleep(&mut self) -> Result<(), LinError> {
        if self.state == NodeState::Uninit {
            return Err(LinError::Uninitialized);
        }

        self.transfer = None;
        self.completion_pending = false;
        self.bus_busy = false;
        self.state = NodeState::SleepMode;

        self.uart.clear_status(StatusFlag::RxActiveEdge);
        self.uart.set_rx_polarity_inverted(false);
        self.uart.set_interrupt(UartInterrupt::RxDataFull, false);
        self.uart.set_interrupt(UartInterrupt::FrameError, false);
        self.uart.set_interrupt(UartInterrupt::LinBreakDetect, false);
        self.uart.set_interrupt(UartInterrupt::RxActiveEdge, true);

        #[cfg(feature = "defmt")]
        defmt::info!("LIN node entering sleep mode");
        Ok(())
    }

    /// Emit a dominant pulse to wake the cluster.
    pub fn send_wakeup_signal(&mut self) -> Result<(), LinError> {
        if self.state == NodeState::Uninit {
            return Err(LinError::Uninitialized);
        }
        if self.bus_busy {
            return Err(LinError::Busy);
        }
        self.uart.put_byte(self.wakeup_byte);
        Ok(())
    }

    /// Arm the tick watchdog for the next transfer.
    pub fn set_timeout_counter(&mut self, ticks: u32) {
        self.timeout_flag = false;
        self.timeout_counter = ticks;
    }

    /// Periodic tick. Counts down while a transfer is in its data phase.
    ///
    /// On expiry the timeout flag is set. A non-blocking transfer is then
    /// reported through the callback and dropped; a blocking one is left to
    /// its waiter, which times out on its own clock.
    pub fn timeout_service(&mut self) {
        if !matches!(self.state, NodeState::SendData | NodeState::RecvData) {
            return;
        }
        let Some(transfer) = self.transfer else {
            return;
        };

        self.timeout_counter = self.timeout_counter.saturating_sub(1);
        if self.timeout_counter != 0 {
            return;
        }

        self.timeout_flag = true;
        if !transfer.is_blocking() {
            #[cfg(feature = "defmt")]
            defmt::warn!("LIN {} transfer timed out", transfer.direction);

            self.event = LinEvent::TimeoutError;
            self.notify();
            self.transfer = None;
            self.goto_idle();
        }
    }

    //==================================================================================INTERNALS
    fn reset_runtime(&mut self) {
        self.event = LinEvent::NoEvent;
        self.current_id = 0;
        self.current_pid = 0;
        self.tx_size = 0;
        self.rx_size = 0;
        self.cnt_byte = 0;
        self.checksum = 0;
        self.readback_fault = false;
        self.bus_busy = false;
        self.transfer = None;
        self.completion_pending = false;
        self.timeout_counter = 0;
        self.timeout_flag = false;
    }

    /// Shared validation of send/receive requests.
    fn check_transfer_request(&self, size: usize) -> Result<(), LinError> {
        if self.state == NodeState::Uninit {
            return Err(LinError::Uninitialized);
        }
        if size == 0 || size > MAX_FRAME_DATA || self.state == NodeState::SleepMode {
            return Err(LinError::InvalidArgument);
        }
        if self.bus_busy || self.transfer.is_some() {
            return Err(LinError::Busy);
        }
        Ok(())
    }

    fn arm_send(&mut self, data: &[u8], mode: TransferMode) {
        let len = data.len();
        self.tx_data[..len].copy_from_slice(data);
        self.checksum = self.compute_checksum(self.current_pid, data);
        self.tx_size = len as u8 + 1;
        self.cnt_byte = 0;
        self.readback_fault = false;

        self.transfer = Some(Transfer {
            direction: Direction::Tx,
            mode,
        });
        self.bus_busy = true;
        self.event = LinEvent::NoEvent;
        self.uart.set_break_detect_width(BreakDetectWidth::Bits10);
        self.state = NodeState::SendData;
    }

    fn arm_recv(&mut self, size: usize, mode: TransferMode) {
        self.rx_size = size as u8 + 1;
        self.cnt_byte = 0;

        self.transfer = Some(Transfer {
            direction: Direction::Rx,
            mode,
        });
        self.bus_busy = true;
        self.event = LinEvent::NoEvent;
        self.uart.set_break_detect_width(BreakDetectWidth::Bits10);
        self.state = NodeState::RecvData;
    }

    /// Byte `index` of the outgoing frame; the last slot is the checksum.
    fn tx_byte(&self, index: u8) -> u8 {
        if index + 1 == self.tx_size {
            self.checksum
        } else {
            self.tx_data[index as usize]
        }
    }

    /// Wait-then-put step of the blocking send.
    fn feed_tx_byte(&mut self, index: u8) -> FeedOutcome {
        let feeding = self.state == NodeState::SendData
            && matches!(
                self.transfer,
                Some(Transfer {
                    direction: Direction::Tx,
                    mode: TransferMode::Blocking
                })
            );
        if !feeding || self.readback_fault || index >= self.tx_size {
            return FeedOutcome::Stopped;
        }
        if !self.uart.status(StatusFlag::TxReady) {
            return FeedOutcome::NotReady;
        }
        let byte = self.tx_byte(index);
        self.uart.put_byte(byte);
        FeedOutcome::Sent
    }

    /// Foreground epilogue of a blocking transfer, whatever its outcome.
    fn finish_blocking(&mut self) {
        self.transfer = None;
        self.completion_pending = false;
        if self.state != NodeState::Uninit {
            self.goto_idle();
        }
    }

    fn take_completion(&mut self) -> bool {
        core::mem::take(&mut self.completion_pending)
    }

    fn progress(&self, bytes_remaining: u8) -> TransferProgress {
        let status = if self.event == LinEvent::NoEvent && bytes_remaining != 0 {
            TransferStatus::Busy
        } else if self.timeout_flag {
            TransferStatus::Timeout
        } else {
            TransferStatus::Success
        };
        TransferProgress {
            status,
            bytes_remaining,
        }
    }

    /// Hand the current event to the user callback, if any.
    fn notify(&mut self) {
        if let Some(callback) = self.callback {
            let event = self.event;
            callback(self, event);
        }
    }

    /// Return to `Idle`: standard 13-bit break detection, non-inverted
    /// receive line, baseline interrupts armed, bus released.
    fn goto_idle(&mut self) {
        self.uart.set_break_detect_width(BreakDetectWidth::Bits13);
        self.uart.set_rx_polarity_inverted(false);
        self.uart.set_interrupt(UartInterrupt::RxActiveEdge, false);
        self.uart.set_interrupt(UartInterrupt::RxDataFull, true);
        self.uart.set_interrupt(UartInterrupt::FrameError, true);
        self.uart.set_interrupt(UartInterrupt::LinBreakDetect, true);
        self.state = NodeState::Idle;
        self.bus_busy = false;
    }
}
