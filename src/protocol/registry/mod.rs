//! Interrupt registry: maps transport instance numbers to the node bound to
//! them, so a vector-table handler only needs its instance number.
//!
//! ```ignore
//! static REGISTRY: StaticCell<LinRegistry<'static, 2>> = StaticCell::new();
//!
//! let registry = REGISTRY.init(LinRegistry::new());
//! registry.register(0, node)?;
//! // In the UART0 handler:
//! registry.dispatch_interrupt(0);
//! ```
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::error::{LinError, RegistryError};
use crate::protocol::node::LinNode;
use crate::protocol::transport::traits::edge_timer::EdgeTimer;
use crate::protocol::transport::traits::lin_uart::LinUart;

/// Interrupt-side entry points of a node.
pub trait LinInterruptSource {
    fn on_interrupt(&self);
    fn on_edge_capture(&self) -> Result<(), LinError>;
    fn timeout_service(&self);
}

impl<M: RawMutex, U: LinUart, E: EdgeTimer> LinInterruptSource for LinNode<M, U, E> {
    fn on_interrupt(&self) {
        LinNode::on_interrupt(self)
    }

    fn on_edge_capture(&self) -> Result<(), LinError> {
        LinNode::on_edge_capture(self)
    }

    fn timeout_service(&self) {
        LinNode::timeout_service(self)
    }
}

/// Table of `N` transport instances.
pub struct LinRegistry<'a, const N: usize> {
    nodes: [Option<&'a dyn LinInterruptSource>; N],
}

impl<const N: usize> Default for LinRegistry<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> LinRegistry<'a, N> {
    pub const fn new() -> Self {
        Self { nodes: [None; N] }
    }

    /// Bind `node` to `instance`.
    ///
    /// # Panics
    /// If `instance >= N`.
    pub fn register(
        &mut self,
        instance: usize,
        node: &'a dyn LinInterruptSource,
    ) -> Result<(), RegistryError> {
        let slot = &mut self.nodes[instance];
        if slot.is_some() {
            return Err(RegistryError::InstanceOccupied { instance });
        }
        *slot = Some(node);
        Ok(())
    }

    /// Free `instance`, returning the node that was bound to it.
    pub fn unregister(&mut self, instance: usize) -> Option<&'a dyn LinInterruptSource> {
        self.nodes[instance].take()
    }

    pub fn is_registered(&self, instance: usize) -> bool {
        self.nodes[instance].is_some()
    }

    /// Route a transport interrupt. An empty slot is ignored.
    ///
    /// # Panics
    /// If `instance >= N`: the handler was wired to the wrong vector.
    pub fn dispatch_interrupt(&self, instance: usize) {
        match self.nodes[instance] {
            Some(node) => node.on_interrupt(),
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("LIN interrupt on unregistered instance {}", instance);
            }
        }
    }

    /// Route an edge-capture interrupt.
    pub fn dispatch_edge_capture(&self, instance: usize) -> Result<(), LinError> {
        match self.nodes[instance] {
            Some(node) => node.on_edge_capture(),
            None => Err(LinError::Uninitialized),
        }
    }

    /// Run the tick watchdog of every registered node.
    pub fn service_timeouts(&self) {
        for node in self.nodes.iter().flatten() {
            node.timeout_service();
        }
    }
}
