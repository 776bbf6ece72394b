//! # Quickstart Example
//!
//! Minimal tour of korri-lin:
//! - Protected identifiers and checksums
//! - Node configuration and frame timeouts
//! - A master header followed by a response on a loopback transport
//!
//! This example uses `std` for a quick trial run.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use std::collections::VecDeque;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use korri_lin::core::{LinEvent, NodeRole};
use korri_lin::infra::codec::pid::ProtectedId;
use korri_lin::protocol::config::LinUserConfig;
use korri_lin::protocol::node::{LinNode, NodeCore};
use korri_lin::protocol::timing::{max_header_timeout_ticks, max_response_timeout_ticks};
use korri_lin::protocol::transport::traits::edge_timer::EdgeTimer;
use korri_lin::protocol::transport::traits::lin_uart::{
    BreakDetectWidth, LinUart, StatusFlag, UartInterrupt,
};
use korri_lin::protocol::transport::TIMEOUT_TICK_US;

/// UART whose transceiver loops every byte and break back to the receiver.
#[derive(Default)]
struct Loopback {
    rx: VecDeque<u8>,
    break_pending: bool,
    baud: u32,
    inverted: bool,
    interrupts: Vec<UartInterrupt>,
}

impl LinUart for Loopback {
    type Error = ();

    fn init(&mut self, baud_rate: u32) -> Result<(), ()> {
        self.baud = baud_rate;
        Ok(())
    }
    fn deinit(&mut self) {}
    fn put_byte(&mut self, byte: u8) {
        println!("   wire <- {:02X}", byte);
        self.rx.push_back(byte);
    }
    fn get_byte(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or(0)
    }
    fn queue_break_field(&mut self) {
        println!("   wire <- BREAK");
        self.break_pending = true;
    }
    fn set_break_detect_width(&mut self, _width: BreakDetectWidth) {}
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), ()> {
        self.baud = baud_rate;
        Ok(())
    }
    fn baud_rate(&self) -> u32 {
        self.baud
    }
    fn set_rx_polarity_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }
    fn is_rx_polarity_inverted(&self) -> bool {
        self.inverted
    }
    fn status(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::LinBreakDetect => self.break_pending,
            StatusFlag::RxDataFull => !self.rx.is_empty(),
            StatusFlag::TxDataEmpty | StatusFlag::TxReady | StatusFlag::TxComplete => true,
            _ => false,
        }
    }
    fn clear_status(&mut self, flag: StatusFlag) {
        if flag == StatusFlag::LinBreakDetect {
            self.break_pending = false;
        }
    }
    fn set_interrupt(&mut self, source: UartInterrupt, enabled: bool) {
        self.interrupts.retain(|s| *s != source);
        if enabled {
            self.interrupts.push(source);
        }
    }
    fn is_interrupt_enabled(&self, source: UartInterrupt) -> bool {
        self.interrupts.contains(&source)
    }
    fn set_transceiver_enabled(&mut self, _enabled: bool) {}
    fn set_node_interrupt_enabled(&mut self, _enabled: bool) {}
}

struct NoEdges;

impl EdgeTimer for NoEdges {
    fn elapsed_us(&mut self) -> u32 {
        0
    }
}

type Core = NodeCore<Loopback, NoEdges>;

/// Publish a two-byte response whenever the header completes.
fn on_event(core: &mut Core, event: LinEvent) {
    println!("   event: {:?}", event);
    if event == LinEvent::PidOk {
        if let Err(e) = core.send_non_blocking(&[0x11, 0x22]) {
            eprintln!("   response refused: {}", e);
        }
    }
}

fn main() {
    println!("=== korri-lin Quickstart ===\n");

    // ======================================================================
    // 1. Protected identifiers
    // ======================================================================
    println!("1. Protected identifiers");
    for id in [0x10, 0x3C, 0x3D] {
        let pid = ProtectedId::from_id(id);
        println!("   id {:02X} -> PID {:02X}", id, pid.value());
    }
    println!();

    // ======================================================================
    // 2. Configuration and frame timeouts
    // ======================================================================
    println!("2. Master configuration");
    let config = match LinUserConfig::builder(NodeRole::Master)
        .baud_rate(19_200)
        .classic_pids(&[0x3C, 0x7D])
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("   invalid configuration: {}", e);
            return;
        }
    };
    println!(
        "   header timeout: {} ticks, 8-byte response timeout: {} ticks\n",
        max_header_timeout_ticks(config.baud_rate, TIMEOUT_TICK_US),
        max_response_timeout_ticks(config.baud_rate, 8, TIMEOUT_TICK_US)
    );

    // ======================================================================
    // 3. Header + response on a loopback bus
    // ======================================================================
    println!("3. Frame 0x10 on a loopback bus");
    let node: LinNode<CriticalSectionRawMutex, _, _> =
        LinNode::new(config, Loopback::default(), NoEdges);
    if let Err(e) = node.init() {
        eprintln!("   init failed: {}", e);
        return;
    }
    node.install_callback(Some(on_event));

    if let Err(e) = node.master_send_header(0x10) {
        eprintln!("   header refused: {}", e);
        return;
    }

    // Stand-in for the UART interrupt line.
    while node.lock(|core| {
        let uart = core.transport();
        uart.status(StatusFlag::LinBreakDetect) || uart.status(StatusFlag::RxDataFull)
    }) {
        node.on_interrupt();
    }

    println!("   final state: {:?}", node.state());
}
