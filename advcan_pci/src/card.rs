//! Card context and teardown engine.
//!
//! `CardContext` is the single ownership record for one bound device:
//! every acquired resource region and every instantiated sub-controller
//! lives here, in acquisition order. `teardown()` is the one reverse-drain
//! routine used both for rolling back a failed bind and for normal
//! removal, so the two paths cannot diverge.

use advcan_common::can::bus::CanBus;
use advcan_common::can::subsystem::{ControllerHandle, ControllerSubsystem};
use tracing::{debug, info, warn};

/// One acquired resource region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredRegion {
    /// Region (BAR) index.
    pub bar: usize,
    /// Mapped base address, for memory-mapped regions.
    pub mapped: Option<u64>,
}

/// One successfully registered sub-controller.
#[derive(Debug, Clone, Copy)]
pub struct BoundPort {
    /// Subsystem handle.
    pub handle: ControllerHandle,
    /// 0-based port index on the card.
    pub port: usize,
}

/// Ownership record for one bound card.
///
/// Created empty at bind start. Regions are appended as they are
/// acquired; port slots are filled left to right as sub-controllers are
/// registered. A slot holds `None` until its port succeeds and again
/// after teardown. Exactly one context exists per bound device and it
/// exclusively owns everything recorded in it.
#[derive(Debug)]
pub struct CardContext {
    regions: Vec<AcquiredRegion>,
    ports: Vec<Option<BoundPort>>,
    msi_enabled: bool,
}

impl CardContext {
    /// Create an empty context with `port_count` unfilled slots.
    pub fn new(port_count: usize) -> Self {
        Self {
            regions: Vec::new(),
            ports: vec![None; port_count],
            msi_enabled: false,
        }
    }

    /// Record a fully acquired region (reserved, and mapped if the
    /// strategy maps it). Never called with a half-acquired region.
    pub fn push_region(&mut self, bar: usize, mapped: Option<u64>) {
        self.regions.push(AcquiredRegion { bar, mapped });
    }

    /// Record that MSI delivery was enabled for this card.
    pub fn set_msi_enabled(&mut self) {
        self.msi_enabled = true;
    }

    /// Store a registered sub-controller into its slot.
    pub fn store_port(&mut self, port: usize, handle: ControllerHandle) {
        debug_assert!(self.ports[port].is_none(), "port slot filled twice");
        self.ports[port] = Some(BoundPort { handle, port });
    }

    /// Mapped base address of an acquired region, if it was mapped.
    pub fn mapped_base(&self, bar: usize) -> Option<u64> {
        self.regions
            .iter()
            .find(|r| r.bar == bar)
            .and_then(|r| r.mapped)
    }

    /// Acquired regions in acquisition order.
    pub fn regions(&self) -> &[AcquiredRegion] {
        &self.regions
    }

    /// Number of filled sub-controller slots.
    pub fn bound_ports(&self) -> usize {
        self.ports.iter().filter(|p| p.is_some()).count()
    }

    /// Whether the context holds nothing to tear down.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.bound_ports() == 0 && !self.msi_enabled
    }

    /// Release everything this context owns, in strict reverse order.
    ///
    /// Order: sub-controllers from highest filled slot down (unregister,
    /// destroy, clear), then MSI disable if it was enabled, then unmap
    /// mappings last-acquired first, then release reservations
    /// last-acquired first. Total and idempotent: every step is
    /// best-effort, a second call finds nothing left, and running it on
    /// an empty context performs zero external calls.
    pub fn teardown(&mut self, bus: &dyn CanBus, subsystem: &dyn ControllerSubsystem) {
        for slot in self.ports.iter_mut().rev() {
            if let Some(bound) = slot.take() {
                info!("removing channel #{}", bound.port + 1);
                subsystem.unregister(bound.handle);
                subsystem.destroy(bound.handle);
            }
        }

        if self.msi_enabled {
            bus.disable_msi();
            self.msi_enabled = false;
        }

        for region in self.regions.iter_mut().rev() {
            if let Some(addr) = region.mapped.take() {
                bus.unmap_region(addr);
            }
        }

        for region in self.regions.drain(..).rev() {
            debug!("releasing region {}", region.bar);
            bus.release_region(region.bar);
        }
    }
}

impl Drop for CardContext {
    fn drop(&mut self) {
        // Teardown needs the bus and subsystem, so it cannot run here;
        // the binder drains the context before dropping it.
        if !self.is_empty() {
            warn!(
                "card context dropped with {} region(s) and {} port(s) still held",
                self.regions.len(),
                self.bound_ports()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{EventLog, SimBus, SimSubsystem};
    use std::sync::Arc;

    #[test]
    fn empty_context_teardown_is_a_no_op() {
        let log = Arc::new(EventLog::default());
        let bus = SimBus::new(0xc302).with_log(log.clone());
        let subsystem = SimSubsystem::new().with_log(log.clone());

        let mut ctx = CardContext::new(2);
        assert!(ctx.is_empty());
        ctx.teardown(&bus, &subsystem);
        assert!(log.take().is_empty(), "no external calls expected");
    }

    #[test]
    fn teardown_is_idempotent() {
        let log = Arc::new(EventLog::default());
        let bus = SimBus::new(0xc302).with_log(log.clone());
        let subsystem = SimSubsystem::new().with_log(log.clone());

        bus.reserve_region(0).unwrap();
        let mut ctx = CardContext::new(1);
        ctx.push_region(0, None);

        ctx.teardown(&bus, &subsystem);
        let first = log.take();
        assert!(!first.is_empty());

        ctx.teardown(&bus, &subsystem);
        assert!(log.take().is_empty(), "second drain must find nothing");
    }
}
