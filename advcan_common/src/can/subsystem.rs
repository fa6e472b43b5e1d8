//! Controller subsystem trait.
//!
//! `ControllerSubsystem` is the seam to the generic per-port CAN
//! controller core. The binding manager only drives the lifecycle -
//! create, configure, register, unregister, destroy - and supplies each
//! controller with its register accessor and clocking; bit timing,
//! interrupt handling and the frame state machine live behind this
//! trait.

use crate::can::accessor::RegisterAccessor;
use crate::can::error::SubsystemError;
use bitflags::bitflags;

bitflags! {
    /// Interrupt request flags for a sub-controller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags: u32 {
        /// The interrupt line is shared with sibling ports; the handler
        /// must tolerate interrupts it did not cause.
        const SHARED = 1 << 0;
    }
}

/// Opaque handle to one controller-core instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerHandle(pub u64);

/// Everything a sub-controller is configured with, fixed at creation.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Register accessor for this port's window.
    pub accessor: RegisterAccessor,
    /// Controller clock in Hz.
    pub clock_hz: u32,
    /// Output control register value.
    pub ocr: u8,
    /// Clock divider register value.
    pub cdr: u8,
    /// Interrupt line (shared across the card's ports).
    pub irq: u32,
    /// Interrupt request flags.
    pub irq_flags: IrqFlags,
    /// 0-based port index on the card.
    pub port: usize,
}

/// Lifecycle operations on the external controller core.
///
/// # Lifecycle
///
/// 1. `create_controller()` - allocate an unconfigured instance
/// 2. `configure()` - wire accessor, clock, OCR/CDR, IRQ, port index
/// 3. `register()` - make the controller live
/// 4. `unregister()` - take a live controller down
/// 5. `destroy()` - free the instance
///
/// `unregister()` and `destroy()` never fail: teardown must always run
/// to completion.
pub trait ControllerSubsystem: Send + Sync {
    /// Allocate a new, unconfigured controller instance.
    ///
    /// # Errors
    /// Returns `SubsystemError::OutOfMemory` if allocation fails.
    fn create_controller(&self) -> Result<ControllerHandle, SubsystemError>;

    /// Configure a controller created by `create_controller()`.
    ///
    /// Must be called exactly once, before `register()`.
    fn configure(&self, handle: ControllerHandle, config: ControllerConfig);

    /// Register a configured controller, making it live.
    ///
    /// # Errors
    /// Returns the subsystem's rejection; the caller discards the
    /// controller and aborts the bind.
    fn register(&self, handle: ControllerHandle) -> Result<(), SubsystemError>;

    /// Unregister a live controller. Best-effort; never fails.
    fn unregister(&self, handle: ControllerHandle);

    /// Free a controller instance. Best-effort; never fails.
    ///
    /// The handle is dead afterwards and must not be used again.
    fn destroy(&self, handle: ControllerHandle);
}
