//! Interrupt registry: binding nodes to instance numbers and dispatching
//! transport, edge-capture and tick interrupts.
mod helpers {
    include!("../../helpers/mod.rs");
}

use helpers::{make_node, take_events, MockEdgeTimer, MockUart, TestNode};
use korri_lin::{
    core::{LinEvent, NodeRole, NodeState},
    error::{LinError, RegistryError},
    protocol::{config::LinUserConfig, registry::LinRegistry},
};
use static_cell::StaticCell;

fn slave_node(cell: &'static StaticCell<TestNode>, uart: &MockUart, autobaud: bool) -> &'static TestNode {
    let config = LinUserConfig::builder(NodeRole::Slave)
        .autobaud(autobaud)
        .build()
        .unwrap();
    cell.init(make_node(config, uart, &MockEdgeTimer::default()))
}

#[tokio::test]
async fn test_dispatch_reaches_registered_node() {
    static NODE: StaticCell<TestNode> = StaticCell::new();
    let uart = MockUart::silent();
    let node = slave_node(&NODE, &uart, false);

    let mut registry: LinRegistry<'static, 2> = LinRegistry::new();
    registry.register(1, node).unwrap();
    assert!(registry.is_registered(1));
    assert!(!registry.is_registered(0));

    uart.inject_break();
    registry.dispatch_interrupt(1);
    assert_eq!(take_events(), vec![LinEvent::RecvBreakFieldOk]);
    assert_eq!(node.state(), NodeState::RecvSync);

    // Empty slot: nothing happens.
    registry.dispatch_interrupt(0);
}

#[tokio::test]
async fn test_occupied_slot_rejected() {
    static FIRST: StaticCell<TestNode> = StaticCell::new();
    static SECOND: StaticCell<TestNode> = StaticCell::new();
    let first = slave_node(&FIRST, &MockUart::silent(), false);
    let second = slave_node(&SECOND, &MockUart::silent(), false);

    let mut registry: LinRegistry<'static, 1> = LinRegistry::new();
    registry.register(0, first).unwrap();
    assert_eq!(
        registry.register(0, second),
        Err(RegistryError::InstanceOccupied { instance: 0 })
    );

    assert!(registry.unregister(0).is_some());
    assert!(registry.unregister(0).is_none());
    assert!(registry.register(0, second).is_ok());
}

#[tokio::test]
async fn test_edge_capture_dispatch() {
    static NODE: StaticCell<TestNode> = StaticCell::new();
    let uart = MockUart::silent();
    let edges = MockEdgeTimer::default();
    let config = LinUserConfig::builder(NodeRole::Slave)
        .autobaud(true)
        .build()
        .unwrap();
    let node: &'static TestNode = NODE.init(make_node(config, &uart, &edges));

    let mut registry: LinRegistry<'static, 2> = LinRegistry::new();
    registry.register(0, node).unwrap();

    edges.push(700);
    assert_eq!(registry.dispatch_edge_capture(0), Ok(()));
    assert_eq!(node.state(), NodeState::RecvSync);
    assert_eq!(
        registry.dispatch_edge_capture(1),
        Err(LinError::Uninitialized)
    );
}

#[tokio::test]
async fn test_service_timeouts_ticks_every_node() {
    static FIRST: StaticCell<TestNode> = StaticCell::new();
    static SECOND: StaticCell<TestNode> = StaticCell::new();
    let first = slave_node(&FIRST, &MockUart::silent(), false);
    let second = slave_node(&SECOND, &MockUart::silent(), false);

    let mut registry: LinRegistry<'static, 3> = LinRegistry::new();
    registry.register(0, first).unwrap();
    registry.register(2, second).unwrap();

    for node in [first, second] {
        node.recv_non_blocking(1).unwrap();
        node.set_timeout_counter(1);
    }
    registry.service_timeouts();

    assert_eq!(
        take_events(),
        vec![LinEvent::TimeoutError, LinEvent::TimeoutError]
    );
    assert!(first.lock(|core| core.is_timed_out()));
    assert!(second.lock(|core| core.is_timed_out()));
}

#[test]
#[should_panic]
fn test_out_of_range_instance_panics() {
    let registry: LinRegistry<'static, 2> = LinRegistry::new();
    registry.dispatch_interrupt(2);
}
