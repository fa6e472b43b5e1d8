//! Register accessor bound into each sub-controller.
//!
//! The accessor is the read/write-byte capability the controller core
//! uses to reach its port's registers. The strategy is resolved once
//! from the board profile at bind time; after that every access is plain
//! address arithmetic with no board-variant branching.

use crate::can::bus::CanBus;
use std::fmt;
use std::sync::Arc;

/// Address arithmetic for one port's register window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    /// Port-addressed: the port owns its own region, so the base alone
    /// selects the port and offsets are not scaled.
    PortAddressed {
        /// I/O-port base of this port's region.
        base: u64,
    },

    /// Memory-mapped: all ports share one mapped region, `stride` bytes
    /// apart.
    MemoryMapped {
        /// Mapped base of the shared region.
        base: u64,
        /// Byte distance between consecutive port windows.
        stride: u64,
        /// This sub-controller's 0-based port index.
        port: u64,
    },
}

/// Read/write-byte capability over one port's registers.
///
/// Immutable after sub-controller creation. `read`/`write` take `&self`
/// and the accessor is `Send + Sync`: sibling ports share an interrupt
/// line and may access their (disjoint) windows concurrently.
#[derive(Clone)]
pub struct RegisterAccessor {
    bus: Arc<dyn CanBus>,
    kind: AccessorKind,
}

impl RegisterAccessor {
    /// Accessor for a port-addressed board: `base` is the port's own
    /// I/O region base.
    pub fn port_addressed(bus: Arc<dyn CanBus>, base: u64) -> Self {
        Self {
            bus,
            kind: AccessorKind::PortAddressed { base },
        }
    }

    /// Accessor for a memory-mapped board: `base` is the shared mapped
    /// region, `port` selects this controller's window.
    pub fn memory_mapped(bus: Arc<dyn CanBus>, base: u64, stride: u64, port: usize) -> Self {
        Self {
            bus,
            kind: AccessorKind::MemoryMapped {
                base,
                stride,
                port: port as u64,
            },
        }
    }

    /// Read the register at byte offset `reg`.
    pub fn read(&self, reg: u8) -> u8 {
        match self.kind {
            AccessorKind::PortAddressed { base } => self.bus.port_read(base + u64::from(reg)),
            AccessorKind::MemoryMapped { base, stride, port } => {
                self.bus.mem_read(base + stride * port + u64::from(reg))
            }
        }
    }

    /// Write `val` to the register at byte offset `reg`.
    pub fn write(&self, reg: u8, val: u8) {
        match self.kind {
            AccessorKind::PortAddressed { base } => {
                self.bus.port_write(base + u64::from(reg), val)
            }
            AccessorKind::MemoryMapped { base, stride, port } => {
                self.bus.mem_write(base + stride * port + u64::from(reg), val)
            }
        }
    }

    /// The strategy and addressing parameters this accessor was built with.
    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    /// Address of register 0 of this port's window (for diagnostics).
    pub fn effective_base(&self) -> u64 {
        match self.kind {
            AccessorKind::PortAddressed { base } => base,
            AccessorKind::MemoryMapped { base, stride, port } => base + stride * port,
        }
    }
}

impl fmt::Debug for RegisterAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterAccessor")
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::error::BusError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records every register access with its address space.
    #[derive(Default)]
    struct TestBus {
        mem: Mutex<HashMap<u64, u8>>,
        ports: Mutex<HashMap<u64, u8>>,
    }

    impl CanBus for TestBus {
        fn vendor_id(&self) -> u16 {
            0
        }
        fn device_id(&self) -> u16 {
            0
        }
        fn irq(&self) -> u32 {
            0
        }
        fn reserve_region(&self, _bar: usize) -> Result<(), BusError> {
            Ok(())
        }
        fn release_region(&self, _bar: usize) {}
        fn region_base(&self, _bar: usize) -> u64 {
            0
        }
        fn map_region(&self, _bar: usize) -> Result<u64, BusError> {
            Ok(0)
        }
        fn unmap_region(&self, _addr: u64) {}
        fn enable_msi(&self) -> Result<(), BusError> {
            Ok(())
        }
        fn disable_msi(&self) {}
        fn port_read(&self, addr: u64) -> u8 {
            *self.ports.lock().unwrap().get(&addr).unwrap_or(&0)
        }
        fn port_write(&self, addr: u64, val: u8) {
            self.ports.lock().unwrap().insert(addr, val);
        }
        fn mem_read(&self, addr: u64) -> u8 {
            *self.mem.lock().unwrap().get(&addr).unwrap_or(&0)
        }
        fn mem_write(&self, addr: u64, val: u8) {
            self.mem.lock().unwrap().insert(addr, val);
        }
    }

    #[test]
    fn memory_mapped_scales_by_stride_and_port() {
        let bus = Arc::new(TestBus::default());
        let port0 = RegisterAccessor::memory_mapped(bus.clone(), 0x1000, 0x400, 0);
        let port1 = RegisterAccessor::memory_mapped(bus.clone(), 0x1000, 0x400, 1);

        port0.write(0x02, 0xaa);
        port1.write(0x02, 0xbb);

        let mem = bus.mem.lock().unwrap();
        assert_eq!(mem.get(&0x1002), Some(&0xaa));
        assert_eq!(mem.get(&0x1402), Some(&0xbb));
    }

    #[test]
    fn port_addressed_does_not_scale_offsets() {
        let bus = Arc::new(TestBus::default());
        let acc = RegisterAccessor::port_addressed(bus.clone(), 0xd000);

        acc.write(0x1f, 0x5a);
        assert_eq!(bus.ports.lock().unwrap().get(&0xd01f), Some(&0x5a));
        assert_eq!(acc.read(0x1f), 0x5a);
        // Nothing ends up in memory space.
        assert!(bus.mem.lock().unwrap().is_empty());
    }

    #[test]
    fn effective_base_matches_window() {
        let bus: Arc<dyn CanBus> = Arc::new(TestBus::default());
        let acc = RegisterAccessor::memory_mapped(bus.clone(), 0x8000, 0x100, 3);
        assert_eq!(acc.effective_base(), 0x8300);

        let acc = RegisterAccessor::port_addressed(bus, 0xd400);
        assert_eq!(acc.effective_base(), 0xd400);
    }
}
