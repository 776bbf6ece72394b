//! Slave autobaud.
//!
//! The edge-capture hook receives the time elapsed since the previous
//! receive-line edge. A long low period in `Idle` is taken as the break.
//! The sync byte that follows (`0x55`, LSB first) then toggles every bit
//! time:
//!
//! ```text
//!  break   delim  S  0  1  0  1  0  1  0  1  P
//! ‾‾‾‾\____/‾‾‾‾‾‾\__/‾‾\__/‾‾\__/‾‾\__/‾‾\__/‾‾‾‾
//! ```
//!
//! The first interval after the break belongs to the delimiter and is
//! skipped. Intervals are then paired into two-bit times. Each pair must
//! fall in the band of one supported rate and stay consistent with the
//! previous pair. After four pairs the rate is accepted.
//!
//! Once locked, the engine lets a few more edges pass (the rest of the
//! sync byte) before enabling the transmit and receive paths.
use super::NodeCore;
use crate::core::{LinEvent, NodeState, WAKEUP_PULSE_MIN_US};
use crate::error::LinError;
use crate::protocol::transport::traits::edge_timer::EdgeTimer;
use crate::protocol::transport::traits::lin_uart::{BreakDetectWidth, LinUart, UartInterrupt};
use crate::protocol::transport::{
    wakeup_byte, AUTOBAUD_BAND_TOLERANCE_PCT, AUTOBAUD_BREAK_MIN_US, AUTOBAUD_RATES,
    AUTOBAUD_REQUIRED_MEASUREMENTS, AUTOBAUD_SETTLE_EDGES, AUTOBAUD_UNSYNC_TOLERANCE_PCT,
};

/// Measurement state carried between edge captures.
#[derive(Debug, Clone, Copy)]
pub(super) struct AutobaudState {
    /// Rate discovery still running.
    pub(super) eval_enabled: bool,
    /// Edges seen since the break, or since lock once locked.
    pub(super) edge_count: u8,
    /// First interval of the current pair.
    pub(super) half_bit_us: u32,
    pub(super) previous_two_bit_us: u32,
    pub(super) transceiver_enabled: bool,
}

impl AutobaudState {
    pub(super) const fn new(eval_enabled: bool) -> Self {
        Self {
            eval_enabled,
            edge_count: 0,
            half_bit_us: 0,
            previous_two_bit_us: 0,
            transceiver_enabled: !eval_enabled,
        }
    }
}

/// Nominal duration of two bits at `baud_rate` (µs), 0 for a zero rate.
pub const fn two_bit_time_us(baud_rate: u32) -> u32 {
    match 2_000_000u32.checked_div(baud_rate) {
        Some(time_us) => time_us,
        None => 0,
    }
}

/// First supported rate whose band contains `two_bit_us`.
pub fn match_baud_rate(two_bit_us: u32) -> Option<u32> {
    AUTOBAUD_RATES.iter().copied().find(|&rate| {
        within(
            two_bit_us,
            two_bit_time_us(rate),
            AUTOBAUD_BAND_TOLERANCE_PCT,
        )
    })
}

/// Whether `current` stays within the unsynchronised-clock tolerance of
/// `previous`.
pub fn is_consistent(current: u32, previous: u32) -> bool {
    within(current, previous, AUTOBAUD_UNSYNC_TOLERANCE_PCT)
}

fn within(value: u32, reference: u32, tolerance_pct: u32) -> bool {
    // Widened so captures near u32::MAX cannot overflow the band.
    let reference = reference as u64;
    let low = reference * 100u64.saturating_sub(tolerance_pct as u64) / 100;
    let high = reference * (100 + tolerance_pct as u64) / 100;
    (low..=high).contains(&(value as u64))
}

impl<U: LinUart, E: EdgeTimer> NodeCore<U, E> {
    /// Edge-capture hook.
    ///
    /// Returns [`LinError::MeasurementRejected`] when the captured interval
    /// is not usable (short pulse, out-of-band or inconsistent timing). An
    /// inconsistent sync byte also sends the node back to `Idle`.
    pub fn autobaud_capture(&mut self) -> Result<(), LinError> {
        if self.state == NodeState::Uninit {
            return Err(LinError::Uninitialized);
        }
        if !self.config.uses_autobaud() {
            return Err(LinError::Unsupported);
        }

        self.event = LinEvent::NoEvent;
        let interval_us = self.edge_timer.elapsed_us();

        if !self.autobaud.eval_enabled {
            self.settle_after_lock();
            return Ok(());
        }

        match self.state {
            NodeState::SleepMode => self.capture_wakeup(interval_us),
            NodeState::Idle => self.capture_break(interval_us),
            _ => self.capture_sync_edge(interval_us),
        }
    }

    pub fn is_baudrate_eval_enabled(&self) -> bool {
        self.autobaud.eval_enabled
    }

    pub fn autobaud_edge_count(&self) -> u8 {
        self.autobaud.edge_count
    }

    fn capture_wakeup(&mut self, interval_us: u32) -> Result<(), LinError> {
        if interval_us < WAKEUP_PULSE_MIN_US {
            return Err(LinError::MeasurementRejected);
        }
        self.event = LinEvent::WakeupSignal;
        self.notify();
        self.goto_idle();
        Ok(())
    }

    fn capture_break(&mut self, interval_us: u32) -> Result<(), LinError> {
        if interval_us < AUTOBAUD_BREAK_MIN_US {
            return Err(LinError::MeasurementRejected);
        }

        self.uart.set_break_detect_width(BreakDetectWidth::Bits10);
        self.uart.set_interrupt(UartInterrupt::LinBreakDetect, false);
        self.bus_busy = true;
        self.event = LinEvent::RecvBreakFieldOk;
        self.notify();
        self.state = NodeState::RecvSync;
        self.autobaud.edge_count = 0;
        Ok(())
    }

    fn capture_sync_edge(&mut self, interval_us: u32) -> Result<(), LinError> {
        let edge = self.autobaud.edge_count;
        self.autobaud.edge_count = edge.saturating_add(1);

        // Edge 0 closes the break delimiter.
        if edge == 0 {
            return Ok(());
        }
        if edge % 2 == 1 {
            self.autobaud.half_bit_us = interval_us;
            return Ok(());
        }

        let two_bit_us = self.autobaud.half_bit_us.saturating_add(interval_us);
        let measurement = edge / 2;

        let Some(rate) = match_baud_rate(two_bit_us) else {
            return self.reject_sync(two_bit_us);
        };
        if measurement > 1 && !is_consistent(two_bit_us, self.autobaud.previous_two_bit_us) {
            return self.reject_sync(two_bit_us);
        }
        self.autobaud.previous_two_bit_us = two_bit_us;

        if measurement < AUTOBAUD_REQUIRED_MEASUREMENTS {
            return Ok(());
        }
        self.lock_baud_rate(rate)
    }

    fn reject_sync(&mut self, _two_bit_us: u32) -> Result<(), LinError> {
        #[cfg(feature = "defmt")]
        defmt::warn!("LIN autobaud: two-bit time {} us rejected", _two_bit_us);

        self.autobaud.edge_count = 0;
        self.goto_idle();
        Err(LinError::MeasurementRejected)
    }

    fn lock_baud_rate(&mut self, rate: u32) -> Result<(), LinError> {
        if self.uart.baud_rate() != rate {
            if let Err(_err) = self.uart.set_baud_rate(rate) {
                self.autobaud.edge_count = 0;
                self.goto_idle();
                return Err(LinError::Transport);
            }
        }

        #[cfg(feature = "defmt")]
        defmt::info!("LIN autobaud locked at {} bit/s", rate);

        self.baud_rate = rate;
        self.wakeup_byte = wakeup_byte(rate);
        self.event = LinEvent::BaudrateAdjusted;
        self.notify();

        self.autobaud.eval_enabled = false;
        self.autobaud.edge_count = 0;
        // The sync byte was validated by the measurement itself.
        self.event = LinEvent::SyncOk;
        self.state = NodeState::RecvPid;
        Ok(())
    }

    fn settle_after_lock(&mut self) {
        if self.autobaud.transceiver_enabled {
            return;
        }
        self.autobaud.edge_count = self.autobaud.edge_count.saturating_add(1);
        if self.autobaud.edge_count >= AUTOBAUD_SETTLE_EDGES {
            self.uart.set_transceiver_enabled(true);
            self.autobaud.transceiver_enabled = true;
        }
    }
}
