//! Interrupt-context protocol state machine.
//!
//! One [`NodeCore::on_interrupt`] call handles one transport interrupt:
//! a break, a receive-line edge while asleep, a framing error or a received
//! byte, followed by the independent overrun check.
use super::NodeCore;
use crate::core::{Direction, LinEvent, NodeRole, NodeState, SYNC_BYTE, WAKEUP_PULSE_MIN_US};
use crate::infra::codec::pid::check_parity;
use crate::protocol::transport::traits::edge_timer::EdgeTimer;
use crate::protocol::transport::traits::lin_uart::{
    BreakDetectWidth, LinUart, StatusFlag, UartInterrupt,
};

impl<U: LinUart, E: EdgeTimer> NodeCore<U, E> {
    /// Interrupt entry point. Ignored while the node is uninitialised.
    pub fn on_interrupt(&mut self) {
        if self.state == NodeState::Uninit {
            return;
        }
        self.event = LinEvent::NoEvent;

        if self.uart.status(StatusFlag::LinBreakDetect) {
            self.on_break_detected();
        } else if self.uart.is_interrupt_enabled(UartInterrupt::RxActiveEdge)
            && self.uart.status(StatusFlag::RxActiveEdge)
        {
            self.on_active_edge();
        } else if self.uart.status(StatusFlag::FrameError) {
            self.on_frame_error();
        } else if self.uart.status(StatusFlag::RxDataFull) {
            let byte = self.uart.get_byte();
            self.process_byte(byte);
        }

        if self.uart.status(StatusFlag::RxOverrun) {
            self.uart.clear_status(StatusFlag::RxOverrun);
            self.event = LinEvent::RxOverrun;
            self.notify();
        }
    }

    fn on_break_detected(&mut self) {
        self.uart.clear_status(StatusFlag::LinBreakDetect);
        self.uart.set_break_detect_width(BreakDetectWidth::Bits10);
        self.uart.set_interrupt(UartInterrupt::LinBreakDetect, false);

        match self.config.role {
            NodeRole::Master => {
                // Our own break read back: follow with the sync byte.
                if self.state == NodeState::SendBreakField {
                    self.bus_busy = true;
                    self.state = NodeState::SendPid;
                    self.uart.put_byte(SYNC_BYTE);
                }
            }
            NodeRole::Slave => {
                // A new frame abandons whatever was in flight, except a
                // reception armed ahead of its header.
                if !self.is_pending_rx() {
                    self.drop_non_blocking();
                }
                self.bus_busy = true;
                self.event = LinEvent::RecvBreakFieldOk;
                self.notify();
                self.state = NodeState::RecvSync;
            }
        }
    }

    /// Wakeup detection: the first edge inverts the line to catch the end of
    /// the dominant pulse, the second measures it.
    fn on_active_edge(&mut self) {
        self.uart.clear_status(StatusFlag::RxActiveEdge);
        if self.state != NodeState::SleepMode {
            return;
        }

        if !self.uart.is_rx_polarity_inverted() {
            self.uart.set_rx_polarity_inverted(true);
            // Restart the measurement at the falling edge.
            let _ = self.edge_timer.elapsed_us();
            return;
        }

        self.uart.set_rx_polarity_inverted(false);
        let pulse_us = self.edge_timer.elapsed_us();
        if pulse_us >= WAKEUP_PULSE_MIN_US {
            #[cfg(feature = "defmt")]
            defmt::info!("LIN wakeup pulse of {} us", pulse_us);

            self.event = LinEvent::WakeupSignal;
            self.notify();
            self.goto_idle();
        }
    }

    fn on_frame_error(&mut self) {
        self.uart.clear_status(StatusFlag::FrameError);
        let _ = self.uart.get_byte();
        self.event = LinEvent::FrameError;

        #[cfg(feature = "defmt")]
        defmt::warn!("LIN frame error in state {}", self.state);

        if matches!(self.state, NodeState::SendData | NodeState::RecvData) {
            self.notify();
        }
        self.drop_non_blocking();
        self.goto_idle();
    }

    fn process_byte(&mut self, byte: u8) {
        match self.state {
            NodeState::RecvSync | NodeState::SendPid | NodeState::RecvPid => {
                self.process_header_byte(byte)
            }
            NodeState::RecvData => self.process_rx_byte(byte),
            NodeState::SendData => self.process_readback(byte),
            _ => {}
        }
    }

    //==================================================================================HEADER
    fn process_header_byte(&mut self, byte: u8) {
        match self.state {
            NodeState::RecvSync => {
                if byte == SYNC_BYTE {
                    self.event = LinEvent::SyncOk;
                    self.state = NodeState::RecvPid;
                } else {
                    self.event = LinEvent::SyncError;
                    self.notify();
                    self.drop_non_blocking();
                    self.goto_idle();
                }
            }
            NodeState::SendPid => {
                if byte == SYNC_BYTE {
                    self.state = NodeState::RecvPid;
                    self.uart.put_byte(self.current_pid);
                } else {
                    // Our own sync corrupted on the wire: release the bus
                    // without reporting.
                    self.event = LinEvent::SyncError;
                    self.bus_busy = false;
                    self.state = NodeState::Idle;
                }
            }
            NodeState::RecvPid => self.process_pid(byte),
            _ => {}
        }
    }

    fn process_pid(&mut self, byte: u8) {
        let accepted = match self.config.role {
            NodeRole::Master => byte == self.current_pid,
            NodeRole::Slave => match check_parity(byte) {
                Some(id) => {
                    self.current_id = id;
                    self.current_pid = byte;
                    true
                }
                None => false,
            },
        };

        if !accepted {
            #[cfg(feature = "defmt")]
            defmt::warn!("LIN PID rejected: {=u8:#x}", byte);

            self.event = LinEvent::PidError;
            self.notify();
            self.drop_non_blocking();
            self.goto_idle();
            return;
        }

        self.event = LinEvent::PidOk;

        if self.is_rx_armed() {
            self.uart.set_break_detect_width(BreakDetectWidth::Bits10);
            self.cnt_byte = 0;
            self.state = NodeState::RecvData;
            return;
        }

        // Header-only exchange: the callback decides what follows.
        self.bus_busy = false;
        self.notify();
        if self.state == NodeState::RecvPid {
            // Nothing armed: the response belongs to another node.
            self.goto_idle();
        }
    }

    fn is_rx_armed(&self) -> bool {
        matches!(self.transfer, Some(t) if t.direction == Direction::Rx)
    }

    /// Reception armed before the header, no byte received yet.
    fn is_pending_rx(&self) -> bool {
        self.is_rx_armed() && self.cnt_byte == 0
    }

    fn drop_non_blocking(&mut self) {
        if matches!(self.transfer, Some(t) if !t.is_blocking()) {
            self.transfer = None;
        }
    }

    //==================================================================================RESPONSE
    fn process_rx_byte(&mut self, byte: u8) {
        if self.cnt_byte >= self.rx_size {
            return;
        }

        let index = self.cnt_byte as usize;
        self.cnt_byte += 1;
        if self.cnt_byte < self.rx_size {
            self.rx_data[index] = byte;
            return;
        }

        // Last byte is the checksum.
        let payload_len = self.rx_size as usize - 1;
        let expected = self.compute_checksum(self.current_pid, &self.rx_data[..payload_len]);
        if byte != expected {
            #[cfg(feature = "defmt")]
            defmt::warn!("LIN checksum mismatch: got {=u8:#x}, expected {=u8:#x}", byte, expected);

            self.event = LinEvent::ChecksumError;
            self.notify();
            self.transfer = None;
            self.goto_idle();
            return;
        }

        self.event = LinEvent::RxCompleted;
        self.state = NodeState::RecvDataCompleted;
        self.notify();
        self.complete_transfer();
    }

    fn process_readback(&mut self, byte: u8) {
        if self.readback_fault || self.cnt_byte >= self.tx_size {
            return;
        }

        let expected = self.tx_byte(self.cnt_byte);
        if byte != expected {
            #[cfg(feature = "defmt")]
            defmt::warn!("LIN readback mismatch: sent {=u8:#x}, read {=u8:#x}", expected, byte);

            self.event = LinEvent::ReadbackError;
            self.notify();
            if matches!(self.transfer, Some(t) if t.is_blocking()) {
                // One report per frame; the waiter ends on its timeout.
                self.readback_fault = true;
            } else {
                self.transfer = None;
                self.goto_idle();
            }
            return;
        }

        self.cnt_byte += 1;
        if self.cnt_byte < self.tx_size {
            if matches!(self.transfer, Some(t) if !t.is_blocking()) {
                let next = self.tx_byte(self.cnt_byte);
                self.uart.put_byte(next);
            }
            return;
        }

        self.event = LinEvent::TxCompleted;
        self.state = NodeState::SendDataCompleted;
        self.notify();
        self.uart.set_interrupt(UartInterrupt::RxDataFull, false);
        self.complete_transfer();
    }

    /// Finish a successful transfer: a non-blocking one returns the node to
    /// `Idle`, a blocking one wakes its waiter.
    fn complete_transfer(&mut self) {
        match self.transfer {
            Some(t) if t.is_blocking() => self.completion_pending = true,
            _ => {
                self.transfer = None;
                self.goto_idle();
            }
        }
    }
}
