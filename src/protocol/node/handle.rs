//! Shareable node handle.
//!
//! [`LinNode`] keeps its [`NodeCore`] behind an embassy blocking mutex so the
//! interrupt handler and foreground code can reach it through a shared
//! reference (typically a `&'static LinNode` from a `StaticCell`). Every call
//! holds the lock only for one engine step.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Duration;
use futures_util::future::{select, Either};
use futures_util::pin_mut;

use super::{FeedOutcome, LinCallback, NodeCore};
use crate::core::{LinEvent, NodeState, TransferMode, TransferProgress};
use crate::error::LinError;
use crate::protocol::config::LinUserConfig;
use crate::protocol::transport::traits::edge_timer::EdgeTimer;
use crate::protocol::transport::traits::lin_timer::LinTimer;
use crate::protocol::transport::traits::lin_uart::LinUart;

/// A LIN node shared between foreground and interrupt context.
pub struct LinNode<M: RawMutex, U, E> {
    core: Mutex<M, RefCell<NodeCore<U, E>>>,
    /// Raised by the interrupt path when a blocking transfer completes.
    completion: Signal<M, ()>,
}

impl<M: RawMutex, U: LinUart, E: EdgeTimer> LinNode<M, U, E> {
    pub fn new(config: LinUserConfig, uart: U, edge_timer: E) -> Self {
        Self {
            core: Mutex::new(RefCell::new(NodeCore::new(config, uart, edge_timer))),
            completion: Signal::new(),
        }
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// Must not be nested: calling back into this `LinNode` from `f`
    /// panics on the inner `RefCell` borrow.
    pub fn lock<R>(&self, f: impl FnOnce(&mut NodeCore<U, E>) -> R) -> R {
        self.core.lock(|cell| f(&mut cell.borrow_mut()))
    }

    //==================================================================================LIFECYCLE
    pub fn init(&self) -> Result<(), LinError> {
        self.completion.reset();
        self.lock(NodeCore::init)
    }

    /// Wait for the transmitter to drain, then release the transport.
    pub fn deinit(&self) -> Result<(), LinError> {
        loop {
            if self.lock(NodeCore::try_release)? {
                return Ok(());
            }
            core::hint::spin_loop();
        }
    }

    pub fn install_callback(
        &self,
        callback: Option<LinCallback<U, E>>,
    ) -> Option<LinCallback<U, E>> {
        self.lock(|core| core.install_callback(callback))
    }

    //==================================================================================QUERIES
    pub fn state(&self) -> NodeState {
        self.lock(|core| core.state())
    }

    pub fn current_event(&self) -> LinEvent {
        self.lock(|core| core.current_event())
    }

    pub fn baud_rate(&self) -> u32 {
        self.lock(|core| core.baud_rate())
    }

    pub fn transmit_status(&self) -> TransferProgress {
        self.lock(|core| core.transmit_status())
    }

    pub fn receive_status(&self) -> TransferProgress {
        self.lock(|core| core.receive_status())
    }

    pub fn copy_received(&self, buffer: &mut [u8]) -> usize {
        self.lock(|core| core.copy_received(buffer))
    }

    pub fn compute_checksum(&self, pid: u8, buffer: &[u8]) -> u8 {
        self.lock(|core| core.compute_checksum(pid, buffer))
    }

    //==================================================================================REQUESTS
    pub fn master_send_header(&self, id: u8) -> Result<(), LinError> {
        self.lock(|core| core.master_send_header(id))
    }

    pub fn send_non_blocking(&self, data: &[u8]) -> Result<(), LinError> {
        self.lock(|core| core.send_non_blocking(data))
    }

    pub fn recv_non_blocking(&self, size: usize) -> Result<(), LinError> {
        self.lock(|core| core.recv_non_blocking(size))
    }

    pub fn abort(&self) -> Result<(), LinError> {
        self.lock(NodeCore::abort)
    }

    pub fn go_to_sleep(&self) -> Result<(), LinError> {
        self.lock(NodeCore::go_to_sleep)
    }

    pub fn send_wakeup_signal(&self) -> Result<(), LinError> {
        self.lock(NodeCore::send_wakeup_signal)
    }

    pub fn set_timeout_counter(&self, ticks: u32) {
        self.lock(|core| core.set_timeout_counter(ticks))
    }

    /// Send a response and wait until every byte has been read back.
    ///
    /// Bytes are written from the calling context, each one once the
    /// transmitter is ready. Whatever the outcome, the node is back in
    /// `Idle` when this returns.
    pub async fn send_blocking<T: LinTimer>(
        &self,
        data: &[u8],
        timeout: Duration,
        timer: &mut T,
    ) -> Result<(), LinError> {
        let frame_len = self.lock(|core| {
            core.check_transfer_request(data.len())?;
            self.completion.reset();
            core.arm_send(data, TransferMode::Blocking);
            Ok::<u8, LinError>(core.tx_size)
        })?;

        'feed: for index in 0..frame_len {
            loop {
                match self.lock(|core| core.feed_tx_byte(index)) {
                    FeedOutcome::Sent => break,
                    FeedOutcome::NotReady => core::hint::spin_loop(),
                    FeedOutcome::Stopped => break 'feed,
                }
            }
        }

        let outcome = self.wait_completion(timeout, timer).await;
        self.lock(NodeCore::finish_blocking);
        outcome
    }

    /// Receive `buffer.len()` bytes plus checksum, waiting at most `timeout`.
    ///
    /// Bytes gathered so far are copied to `buffer` even when the wait
    /// times out.
    pub async fn recv_blocking<T: LinTimer>(
        &self,
        buffer: &mut [u8],
        timeout: Duration,
        timer: &mut T,
    ) -> Result<(), LinError> {
        let size = buffer.len();
        self.lock(|core| {
            core.check_transfer_request(size)?;
            self.completion.reset();
            core.arm_recv(size, TransferMode::Blocking);
            Ok::<(), LinError>(())
        })?;

        let outcome = self.wait_completion(timeout, timer).await;
        self.lock(|core| {
            core.copy_received(buffer);
            core.finish_blocking();
        });
        outcome
    }

    async fn wait_completion<T: LinTimer>(
        &self,
        timeout: Duration,
        timer: &mut T,
    ) -> Result<(), LinError> {
        let done = self.completion.wait();
        let expiry = timer.delay(timeout);
        pin_mut!(done);
        pin_mut!(expiry);

        match select(done, expiry).await {
            Either::Left(_) => Ok(()),
            Either::Right(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("LIN blocking transfer timed out");
                Err(LinError::Timeout)
            }
        }
    }

    //==================================================================================INTERRUPT_HOOKS
    /// Transport interrupt hook.
    pub fn on_interrupt(&self) {
        let completed = self.lock(|core| {
            core.on_interrupt();
            core.take_completion()
        });
        if completed {
            self.completion.signal(());
        }
    }

    /// Receive-line edge capture hook (autobaud slaves).
    pub fn on_edge_capture(&self) -> Result<(), LinError> {
        self.lock(NodeCore::autobaud_capture)
    }

    /// Periodic tick hook.
    pub fn timeout_service(&self) {
        self.lock(NodeCore::timeout_service)
    }
}
