//! Sleep mode, wakeup pulse detection and wakeup transmission.
mod helpers {
    include!("../../helpers/mod.rs");
}

use helpers::{make_node, master, pump, take_events, MockEdgeTimer, MockUart, TestNode};
use korri_lin::{
    core::{LinEvent, NodeRole, NodeState},
    error::LinError,
    protocol::{config::LinUserConfig, transport::traits::lin_uart::UartInterrupt},
};

fn sleeping_master() -> (TestNode, MockUart, MockEdgeTimer) {
    let uart = MockUart::new();
    let edges = MockEdgeTimer::default();
    let config = LinUserConfig::builder(NodeRole::Master).build().unwrap();
    let node = make_node(config, &uart, &edges);
    node.go_to_sleep().unwrap();
    (node, uart, edges)
}

/// Falling then rising edge around a dominant pulse of `width_us`.
fn pulse(node: &TestNode, uart: &MockUart, edges: &MockEdgeTimer, width_us: u32) {
    edges.push(0);
    edges.push(width_us);
    uart.inject_edge();
    pump(node, uart);
    uart.inject_edge();
    pump(node, uart);
}

#[tokio::test]
async fn test_sleep_arms_edge_watch_only() {
    let (node, uart, _edges) = sleeping_master();

    assert_eq!(node.state(), NodeState::SleepMode);
    assert!(uart.interrupt_enabled(UartInterrupt::RxActiveEdge));
    assert!(!uart.interrupt_enabled(UartInterrupt::RxDataFull));
    assert!(!uart.interrupt_enabled(UartInterrupt::LinBreakDetect));
    assert!(!uart.interrupt_enabled(UartInterrupt::FrameError));
}

#[tokio::test]
async fn test_wakeup_pulse_detected() {
    let (node, uart, edges) = sleeping_master();

    pulse(&node, &uart, &edges, 200);

    assert_eq!(take_events(), vec![LinEvent::WakeupSignal]);
    assert_eq!(node.state(), NodeState::Idle);
    assert!(!uart.interrupt_enabled(UartInterrupt::RxActiveEdge));
    assert!(uart.interrupt_enabled(UartInterrupt::RxDataFull));
    assert!(!uart.wire().rx_inverted);
}

#[tokio::test]
async fn test_short_pulse_ignored() {
    let (node, uart, edges) = sleeping_master();

    pulse(&node, &uart, &edges, 100);

    assert!(take_events().is_empty());
    assert_eq!(node.state(), NodeState::SleepMode);
    assert!(!uart.wire().rx_inverted);

    // Still watching: a proper pulse wakes the node.
    pulse(&node, &uart, &edges, 150);
    assert_eq!(take_events(), vec![LinEvent::WakeupSignal]);
}

#[tokio::test]
/// An autobaud slave classifies the pulse from the edge-capture hook.
async fn test_wakeup_through_edge_capture() {
    let uart = MockUart::silent();
    let edges = MockEdgeTimer::default();
    let config = LinUserConfig::builder(NodeRole::Slave)
        .autobaud(true)
        .build()
        .unwrap();
    let node = make_node(config, &uart, &edges);
    node.go_to_sleep().unwrap();

    edges.push(100);
    assert_eq!(node.on_edge_capture(), Err(LinError::MeasurementRejected));
    assert_eq!(node.state(), NodeState::SleepMode);
    assert!(take_events().is_empty());

    edges.push(200);
    assert_eq!(node.on_edge_capture(), Ok(()));
    assert_eq!(take_events(), vec![LinEvent::WakeupSignal]);
    assert_eq!(node.state(), NodeState::Idle);
}

#[tokio::test]
async fn test_transfers_refused_while_asleep() {
    let (node, _uart, _edges) = sleeping_master();

    assert_eq!(node.send_non_blocking(&[0x01]), Err(LinError::InvalidArgument));
    assert_eq!(node.recv_non_blocking(1), Err(LinError::InvalidArgument));
    assert_eq!(node.master_send_header(0x10), Err(LinError::InvalidArgument));
}

#[tokio::test]
/// Sleep drops whatever transfer was in flight.
async fn test_sleep_cancels_transfer() {
    let (node, uart) = master(19_200);
    node.master_send_header(0x10).unwrap();
    pump(&node, &uart);
    node.recv_non_blocking(2).unwrap();

    node.go_to_sleep().unwrap();
    assert!(node.lock(|core| core.transfer().is_none()));
    assert!(!node.lock(|core| core.is_bus_busy()));
}

#[tokio::test]
async fn test_wakeup_byte_follows_baud_rate() {
    let (fast, fast_uart) = master(19_200);
    fast.send_wakeup_signal().unwrap();
    assert_eq!(fast_uart.tx_log(), vec![0x80]);

    let (slow, slow_uart) = master(9_600);
    slow.send_wakeup_signal().unwrap();
    assert_eq!(slow_uart.tx_log(), vec![0xF8]);
}

#[tokio::test]
async fn test_wakeup_from_sleep_mode() {
    let (node, uart, _edges) = sleeping_master();

    node.send_wakeup_signal().unwrap();
    assert_eq!(uart.tx_log(), vec![0x80]);
    assert_eq!(node.state(), NodeState::SleepMode);
}
