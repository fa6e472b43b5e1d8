//! PCI bus layer trait.
//!
//! `CanBus` is the seam between the binding manager and the bus
//! enumeration / resource infrastructure. One implementation wraps the
//! real bus; the simulated implementation in `advcan_pci::sim` backs the
//! tests and the CLI.

use crate::can::error::BusError;

/// Bus-side operations for one discovered PCI device.
///
/// # Lifecycle
///
/// 1. `reserve_region()` / `map_region()` - during bind, per profile
/// 2. `port_read()` etc. - for the card's bound lifetime, from the
///    controller subsystem's interrupt/processing context
/// 3. `unmap_region()` / `release_region()` - during teardown, in strict
///    reverse of acquisition order
///
/// # Concurrency
///
/// Register I/O may be issued concurrently across ports, since sibling
/// sub-controllers share one physical interrupt line. Implementations
/// must be `Send + Sync` and must not reorder or elide register accesses
/// relative to caller-issued sequencing: every call is a device access,
/// not a memory load/store the compiler may optimize.
pub trait CanBus: Send + Sync {
    /// PCI vendor ID of this device.
    fn vendor_id(&self) -> u16;

    /// PCI device ID of this device.
    fn device_id(&self) -> u16;

    /// Interrupt line assigned to this device (shared by all ports).
    fn irq(&self) -> u32;

    /// Reserve a resource region for exclusive use.
    ///
    /// # Errors
    /// Returns `BusError::RegionBusy` if the region is already claimed.
    fn reserve_region(&self, bar: usize) -> Result<(), BusError>;

    /// Release a previously reserved region. Best-effort; never fails.
    fn release_region(&self, bar: usize);

    /// Bus address where the region starts (I/O-port base for
    /// port-addressed regions).
    fn region_base(&self, bar: usize) -> u64;

    /// Map a reserved memory region into addressable space.
    ///
    /// # Errors
    /// Returns `BusError::MapFailed` if the mapping cannot be created.
    fn map_region(&self, bar: usize) -> Result<u64, BusError>;

    /// Unmap a mapping returned by `map_region()`. Best-effort.
    fn unmap_region(&self, addr: u64);

    /// Enable message-signalled interrupt delivery.
    ///
    /// Best-effort: the binding manager logs a failure and continues in
    /// line-interrupt mode, so implementations may simply return
    /// `BusError::MsiUnsupported`.
    fn enable_msi(&self) -> Result<(), BusError>;

    /// Disable MSI delivery enabled by `enable_msi()`. Best-effort.
    fn disable_msi(&self);

    /// Read one byte from an I/O port.
    fn port_read(&self, addr: u64) -> u8;

    /// Write one byte to an I/O port.
    fn port_write(&self, addr: u64, val: u8);

    /// Read one byte from a mapped memory address.
    fn mem_read(&self, addr: u64) -> u8;

    /// Write one byte to a mapped memory address.
    fn mem_write(&self, addr: u64, val: u8);
}
