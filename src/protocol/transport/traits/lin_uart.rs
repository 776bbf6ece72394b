//! Minimal abstraction over a LIN-capable UART peripheral. Allows the node
//! engine to plug into various implementations (HAL driver, register-level
//! driver, host simulation).

/// Break-detection threshold programmed into the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BreakDetectWidth {
    /// Short threshold used while the node transmits, so collisions surface quickly.
    Bits10,
    /// Standard threshold armed whenever the node is idle.
    Bits13,
}

/// Status flags the engine queries and clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusFlag {
    LinBreakDetect,
    FrameError,
    RxDataFull,
    RxActiveEdge,
    RxOverrun,
    TxDataEmpty,
    TxReady,
    TxComplete,
}

/// Interrupt sources the engine enables and disables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartInterrupt {
    LinBreakDetect,
    FrameError,
    RxDataFull,
    RxActiveEdge,
}

/// Contract of the byte transport below a LIN node.
///
/// Every method is called with the node lock held, from either foreground
/// or interrupt context, and must not block except where documented.
pub trait LinUart {
    type Error: core::fmt::Debug;

    /// Configure the peripheral for 8N1 LIN operation at `baud_rate`.
    fn init(&mut self, baud_rate: u32) -> Result<(), Self::Error>;
    /// Release the peripheral.
    fn deinit(&mut self);

    /// Write one byte into the transmit register.
    fn put_byte(&mut self, byte: u8);
    /// Read the receive register.
    fn get_byte(&mut self) -> u8;
    /// Queue a break field on the transmit line.
    fn queue_break_field(&mut self);

    fn set_break_detect_width(&mut self, width: BreakDetectWidth);
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), Self::Error>;
    fn baud_rate(&self) -> u32;

    /// Invert the receive line, used to catch the rising edge of a pulse.
    fn set_rx_polarity_inverted(&mut self, inverted: bool);
    fn is_rx_polarity_inverted(&self) -> bool;

    fn status(&self, flag: StatusFlag) -> bool;
    fn clear_status(&mut self, flag: StatusFlag);

    fn set_interrupt(&mut self, source: UartInterrupt, enabled: bool);
    fn is_interrupt_enabled(&self, source: UartInterrupt) -> bool;

    /// Enable or disable the transmitter and receiver paths together.
    fn set_transceiver_enabled(&mut self, enabled: bool);
    /// Enable or disable the node's line in the interrupt controller.
    fn set_node_interrupt_enabled(&mut self, enabled: bool);
}
