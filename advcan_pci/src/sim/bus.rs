//! Simulated PCI bus.

use super::{EventLog, SimEvent};
use advcan_common::can::bus::CanBus;
use advcan_common::can::consts::ADVANTECH_VENDOR_ID;
use advcan_common::can::error::BusError;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Deterministic base address of a simulated I/O-port region.
fn sim_region_base(bar: usize) -> u64 {
    0xd000 + bar as u64 * 0x100
}

/// Deterministic mapped address of a simulated memory region.
fn sim_mapped_base(bar: usize) -> u64 {
    0xfeb0_0000 + bar as u64 * 0x10_0000
}

#[derive(Default)]
struct SimBusState {
    reserved: BTreeSet<usize>,
    mappings: HashMap<u64, usize>,
    mem: HashMap<u64, u8>,
    io_ports: HashMap<u64, u8>,
    msi: bool,
    fail_reserve: BTreeSet<usize>,
    fail_map: BTreeSet<usize>,
    fail_msi: bool,
}

/// In-memory `CanBus` implementation with injectable failures.
///
/// Register space is a sparse byte store per address space (memory vs
/// I/O ports), so accessor arithmetic can be verified by writing through
/// an accessor and reading the raw address back.
pub struct SimBus {
    vendor_id: u16,
    device_id: u16,
    irq: u32,
    log: Arc<EventLog>,
    state: Mutex<SimBusState>,
}

impl SimBus {
    /// Simulated Advantech device with the given PCI device ID, on IRQ 11.
    pub fn new(device_id: u16) -> Self {
        Self {
            vendor_id: ADVANTECH_VENDOR_ID,
            device_id,
            irq: 11,
            log: Arc::new(EventLog::default()),
            state: Mutex::new(SimBusState::default()),
        }
    }

    /// Override the vendor ID, for simulating foreign devices.
    pub fn with_vendor(mut self, vendor_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self
    }

    /// Attach a (possibly shared) event log.
    pub fn with_log(mut self, log: Arc<EventLog>) -> Self {
        self.log = log;
        self
    }

    /// Override the assigned interrupt line.
    pub fn with_irq(mut self, irq: u32) -> Self {
        self.irq = irq;
        self
    }

    /// Make `reserve_region(bar)` fail with `RegionBusy`.
    pub fn fail_reserve(&self, bar: usize) {
        self.state.lock().unwrap().fail_reserve.insert(bar);
    }

    /// Make `map_region(bar)` fail with `MapFailed`.
    pub fn fail_map(&self, bar: usize) {
        self.state.lock().unwrap().fail_map.insert(bar);
    }

    /// Make `enable_msi()` fail with `MsiUnsupported`.
    pub fn fail_msi(&self) {
        self.state.lock().unwrap().fail_msi = true;
    }

    /// Currently reserved region indices, ascending.
    pub fn reserved_regions(&self) -> Vec<usize> {
        self.state.lock().unwrap().reserved.iter().copied().collect()
    }

    /// Number of live mappings.
    pub fn mapped_count(&self) -> usize {
        self.state.lock().unwrap().mappings.len()
    }

    /// Whether MSI delivery is currently enabled.
    pub fn msi_enabled(&self) -> bool {
        self.state.lock().unwrap().msi
    }
}

impl CanBus for SimBus {
    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    fn device_id(&self) -> u16 {
        self.device_id
    }

    fn irq(&self) -> u32 {
        self.irq
    }

    fn reserve_region(&self, bar: usize) -> Result<(), BusError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_reserve.contains(&bar) || !state.reserved.insert(bar) {
            return Err(BusError::RegionBusy(bar));
        }
        self.log.record(SimEvent::Reserve(bar));
        Ok(())
    }

    fn release_region(&self, bar: usize) {
        let mut state = self.state.lock().unwrap();
        if !state.reserved.remove(&bar) {
            warn!("release of region {bar} that is not reserved");
        }
        self.log.record(SimEvent::Release(bar));
    }

    fn region_base(&self, bar: usize) -> u64 {
        sim_region_base(bar)
    }

    fn map_region(&self, bar: usize) -> Result<u64, BusError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_map.contains(&bar) {
            return Err(BusError::MapFailed(bar));
        }
        let addr = sim_mapped_base(bar);
        state.mappings.insert(addr, bar);
        self.log.record(SimEvent::Map(bar));
        Ok(addr)
    }

    fn unmap_region(&self, addr: u64) {
        let mut state = self.state.lock().unwrap();
        match state.mappings.remove(&addr) {
            Some(bar) => self.log.record(SimEvent::Unmap(bar)),
            None => warn!("unmap of unknown address {addr:#x}"),
        }
    }

    fn enable_msi(&self) -> Result<(), BusError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_msi {
            return Err(BusError::MsiUnsupported);
        }
        state.msi = true;
        self.log.record(SimEvent::MsiEnable);
        Ok(())
    }

    fn disable_msi(&self) {
        let mut state = self.state.lock().unwrap();
        state.msi = false;
        self.log.record(SimEvent::MsiDisable);
    }

    fn port_read(&self, addr: u64) -> u8 {
        *self.state.lock().unwrap().io_ports.get(&addr).unwrap_or(&0)
    }

    fn port_write(&self, addr: u64, val: u8) {
        self.state.lock().unwrap().io_ports.insert(addr, val);
    }

    fn mem_read(&self, addr: u64) -> u8 {
        *self.state.lock().unwrap().mem.get(&addr).unwrap_or(&0)
    }

    fn mem_write(&self, addr: u64, val: u8) {
        self.state.lock().unwrap().mem.insert(addr, val);
    }
}
