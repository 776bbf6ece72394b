//! Master frame exchanges: header, published and subscribed responses,
//! request validation, bus faults and abort.
mod helpers {
    include!("../../helpers/mod.rs");
}

use embassy_time::Duration;
use helpers::{drive, master, pump, take_events, MockTimer};
use korri_lin::{
    core::{LinEvent, NodeState, TransferStatus},
    error::LinError,
    infra::codec::pid::make_parity,
};

#[tokio::test]
/// Header for 0x10 followed by a blocking two-byte response.
async fn test_header_then_blocking_send() {
    let (node, uart) = master(19_200);

    node.master_send_header(0x10).unwrap();
    assert_eq!(node.state(), NodeState::SendBreakField);
    assert_eq!(uart.wire().breaks_queued, 1);

    pump(&node, &uart);
    assert_eq!(take_events(), vec![LinEvent::PidOk]);
    assert_eq!(node.state(), NodeState::Idle);
    assert!(!node.lock(|core| core.is_bus_busy()));

    let mut timer = MockTimer;
    let (result, _) = tokio::join!(
        node.send_blocking(&[0x11, 0x22], Duration::from_millis(100), &mut timer),
        drive(&node, &uart, 16),
    );
    assert_eq!(result, Ok(()));

    let pid = make_parity(0x10);
    let checksum = node.compute_checksum(pid, &[0x11, 0x22]);
    assert_eq!(uart.tx_log(), vec![0x55, pid, 0x11, 0x22, checksum]);
    assert_eq!(take_events(), vec![LinEvent::TxCompleted]);
    assert_eq!(node.state(), NodeState::Idle);
    assert!(node.lock(|core| core.transfer().is_none()));
}

#[tokio::test]
async fn test_non_blocking_send_with_polling() {
    let (node, uart) = master(19_200);
    node.master_send_header(0x10).unwrap();
    pump(&node, &uart);
    take_events();

    node.send_non_blocking(&[0x01, 0x02, 0x03]).unwrap();
    let progress = node.transmit_status();
    assert_eq!(progress.status, TransferStatus::Busy);
    assert_eq!(progress.bytes_remaining, 4);

    // One byte per interrupt: each readback releases the next byte.
    node.on_interrupt();
    assert_eq!(node.transmit_status().bytes_remaining, 3);
    assert_eq!(uart.tx_log().len(), 4);

    pump(&node, &uart);
    let progress = node.transmit_status();
    assert_eq!(progress.status, TransferStatus::Success);
    assert_eq!(progress.bytes_remaining, 0);
    assert_eq!(take_events(), vec![LinEvent::TxCompleted]);
    assert_eq!(node.state(), NodeState::Idle);

    let checksum = node.compute_checksum(0x50, &[0x01, 0x02, 0x03]);
    assert_eq!(
        uart.tx_log(),
        vec![0x55, 0x50, 0x01, 0x02, 0x03, checksum]
    );
}

#[tokio::test]
async fn test_non_blocking_receive_of_slave_response() {
    let (node, uart) = master(19_200);
    node.master_send_header(0x10).unwrap();
    pump(&node, &uart);
    take_events();

    node.recv_non_blocking(2).unwrap();
    let checksum = node.compute_checksum(0x50, &[0xAA, 0xBB]);
    uart.inject_rx(&[0xAA, 0xBB, checksum]);
    pump(&node, &uart);

    assert_eq!(take_events(), vec![LinEvent::RxCompleted]);
    assert_eq!(node.receive_status().status, TransferStatus::Success);

    let mut buffer = [0u8; 2];
    assert_eq!(node.copy_received(&mut buffer), 2);
    assert_eq!(buffer, [0xAA, 0xBB]);
}

#[tokio::test]
async fn test_readback_mismatch_drops_non_blocking_send() {
    let (node, uart) = master(19_200);
    node.master_send_header(0x10).unwrap();
    pump(&node, &uart);
    take_events();

    // tx_log: 0x55, PID, 0x01, 0x02 <- corrupted on the wire
    uart.wire().corrupt_echo = Some((3, 0x00));
    node.send_non_blocking(&[0x01, 0x02]).unwrap();
    pump(&node, &uart);

    assert_eq!(take_events(), vec![LinEvent::ReadbackError]);
    assert_eq!(node.state(), NodeState::Idle);
    assert!(!node.lock(|core| core.is_tx_busy()));
}

#[tokio::test]
/// A blocking send reports a corrupted readback once, stops feeding and
/// ends on its timeout.
async fn test_readback_mismatch_stops_blocking_send() {
    let (node, uart) = master(19_200);
    node.master_send_header(0x10).unwrap();
    pump(&node, &uart);
    take_events();

    // tx_log: 0x55, PID, 0x11, 0x22 <- corrupted on the wire
    uart.wire().corrupt_echo = Some((3, 0x00));
    let mut timer = MockTimer;
    let (result, _) = tokio::join!(
        node.send_blocking(&[0x11, 0x22], Duration::from_millis(5), &mut timer),
        drive(&node, &uart, 16),
    );

    assert_eq!(result, Err(LinError::Timeout));
    assert_eq!(take_events(), vec![LinEvent::ReadbackError]);
    assert_eq!(node.state(), NodeState::Idle);
    assert!(node.lock(|core| core.transfer().is_none()));
    assert!(node.master_send_header(0x11).is_ok());
}

#[tokio::test]
/// Sizes 0, 9 and 255 are rejected before anything reaches the transport.
async fn test_transfer_size_validation() {
    let (node, uart) = master(19_200);

    assert_eq!(node.send_non_blocking(&[]), Err(LinError::InvalidArgument));
    assert_eq!(node.send_non_blocking(&[0; 9]), Err(LinError::InvalidArgument));
    assert_eq!(node.send_non_blocking(&[0; 255]), Err(LinError::InvalidArgument));
    assert_eq!(node.recv_non_blocking(9), Err(LinError::InvalidArgument));

    let mut timer = MockTimer;
    let mut buffer = [0u8; 9];
    let result = node
        .recv_blocking(&mut buffer, Duration::from_millis(5), &mut timer)
        .await;
    assert_eq!(result, Err(LinError::InvalidArgument));

    assert_eq!(node.master_send_header(0x40), Err(LinError::InvalidArgument));
    assert!(uart.tx_log().is_empty());
}

#[tokio::test]
async fn test_busy_while_header_in_flight() {
    let (node, uart) = master(19_200);
    node.master_send_header(0x10).unwrap();

    assert_eq!(node.master_send_header(0x11), Err(LinError::Busy));
    assert_eq!(node.send_non_blocking(&[0x01]), Err(LinError::Busy));
    assert_eq!(node.send_wakeup_signal(), Err(LinError::Busy));

    pump(&node, &uart);
    assert!(node.send_non_blocking(&[0x01]).is_ok());
}

#[tokio::test]
async fn test_abort_is_idempotent() {
    let (node, uart) = master(19_200);
    node.master_send_header(0x10).unwrap();
    pump(&node, &uart);
    take_events();

    node.send_non_blocking(&[0x01, 0x02]).unwrap();
    node.abort().unwrap();
    node.abort().unwrap();
    assert_eq!(node.state(), NodeState::Idle);

    // The byte already on the wire is read back in IDLE and ignored.
    pump(&node, &uart);
    assert!(take_events().is_empty());

    assert!(node.master_send_header(0x11).is_ok());
}

#[tokio::test]
/// A corrupted sync echo releases the bus silently.
async fn test_sync_echo_mismatch() {
    let (node, uart) = master(19_200);
    uart.wire().corrupt_echo = Some((0, 0x54));

    node.master_send_header(0x10).unwrap();
    pump(&node, &uart);

    assert!(take_events().is_empty());
    assert_eq!(node.state(), NodeState::Idle);
    assert_eq!(node.current_event(), LinEvent::SyncError);
    assert!(!node.lock(|core| core.is_bus_busy()));
}

#[tokio::test]
async fn test_pid_echo_mismatch() {
    let (node, uart) = master(19_200);
    uart.wire().corrupt_echo = Some((1, 0x51));

    node.master_send_header(0x10).unwrap();
    pump(&node, &uart);

    assert_eq!(take_events(), vec![LinEvent::PidError]);
    assert_eq!(node.state(), NodeState::Idle);
}

#[tokio::test]
async fn test_frame_error_during_send() {
    let (node, uart) = master(19_200);
    node.master_send_header(0x10).unwrap();
    pump(&node, &uart);
    take_events();

    node.send_non_blocking(&[0x01, 0x02]).unwrap();
    uart.inject_frame_error();
    pump(&node, &uart);

    assert_eq!(take_events(), vec![LinEvent::FrameError]);
    assert_eq!(node.state(), NodeState::Idle);
    assert!(node.lock(|core| core.transfer().is_none()));
}

#[tokio::test]
/// Overrun is reported without touching the protocol state.
async fn test_overrun_is_advisory() {
    let (node, uart) = master(19_200);
    uart.inject_overrun();
    pump(&node, &uart);

    assert_eq!(take_events(), vec![LinEvent::RxOverrun]);
    assert_eq!(node.state(), NodeState::Idle);
}

#[tokio::test]
async fn test_deinit_releases_transport() {
    let (node, uart) = master(19_200);
    assert!(uart.wire().node_irq_enabled);

    node.deinit().unwrap();
    assert_eq!(node.state(), NodeState::Uninit);
    assert!(!uart.wire().initialised);
    assert!(!uart.wire().node_irq_enabled);
    assert_eq!(node.send_non_blocking(&[0x01]), Err(LinError::Uninitialized));
    assert_eq!(node.deinit(), Err(LinError::Uninitialized));
}

#[tokio::test]
async fn test_init_failure_maps_to_transport_error() {
    use helpers::{MockEdgeTimer, MockUart, TestNode};
    use korri_lin::{core::NodeRole, protocol::config::LinUserConfig};

    let uart = MockUart::new();
    uart.wire().fail_init = true;
    let config = LinUserConfig::builder(NodeRole::Master).build().unwrap();
    let node = TestNode::new(config, uart.clone(), MockEdgeTimer::default());

    assert_eq!(node.init(), Err(LinError::Transport));
    assert_eq!(node.state(), NodeState::Uninit);
}
