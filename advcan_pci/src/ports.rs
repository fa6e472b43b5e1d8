//! Sub-controller instantiation loop.
//!
//! For each port of a profile: allocate a controller, wire its register
//! accessor, clock and interrupt configuration, and register it with the
//! controller subsystem. A failure on port `i` discards the partial
//! controller - it is never stored - and aborts the loop with ports
//! `0..i` still registered in the context, ready for the caller's
//! teardown.

use crate::card::CardContext;
use advcan_common::can::accessor::RegisterAccessor;
use advcan_common::can::bus::CanBus;
use advcan_common::can::consts::{BOARD_CDR, BOARD_OCR, CAN_CLOCK_HZ};
use advcan_common::can::error::BindError;
use advcan_common::can::profile::{AccessStrategy, BoardProfile};
use advcan_common::can::subsystem::{ControllerConfig, ControllerSubsystem, IrqFlags};
use std::sync::Arc;
use tracing::info;

/// Build the accessor for one port from the context's acquired regions.
///
/// Port-addressed: the port's own region base, no offset scaling.
/// Memory-mapped: the shared mapping plus `stride * port`.
fn accessor_for_port(
    bus: &Arc<dyn CanBus>,
    profile: &BoardProfile,
    ctx: &CardContext,
    port: usize,
) -> RegisterAccessor {
    match &profile.access {
        AccessStrategy::PortAddressed { .. } => {
            let bar = profile.bar_for_port(port);
            RegisterAccessor::port_addressed(bus.clone(), bus.region_base(bar))
        }
        AccessStrategy::MemoryMapped { bar, stride } => {
            let base = ctx
                .mapped_base(*bar)
                .expect("memory-mapped region acquired before instantiation");
            RegisterAccessor::memory_mapped(bus.clone(), base, *stride, port)
        }
    }
}

/// Instantiate and register one sub-controller per port.
///
/// Successful ports are stored into the context's slots left to right.
/// On failure the loop aborts immediately; already-registered ports stay
/// in the context and the caller runs full teardown.
///
/// # Errors
/// `ControllerAllocation` or `ControllerRegistration` with the failing
/// port index.
pub fn instantiate(
    bus: &Arc<dyn CanBus>,
    subsystem: &dyn ControllerSubsystem,
    profile: &BoardProfile,
    ctx: &mut CardContext,
) -> Result<(), BindError> {
    let irq = bus.irq();

    for port in 0..profile.ports {
        let accessor = accessor_for_port(bus, profile, ctx, port);
        let base = accessor.effective_base();

        let handle = subsystem
            .create_controller()
            .map_err(|source| BindError::ControllerAllocation { port, source })?;

        subsystem.configure(
            handle,
            ControllerConfig {
                accessor,
                clock_hz: CAN_CLOCK_HZ,
                ocr: BOARD_OCR,
                cdr: BOARD_CDR,
                irq,
                irq_flags: IrqFlags::SHARED,
                port,
            },
        );

        if let Err(source) = subsystem.register(handle) {
            // Discard the partial controller; it never reaches the context.
            subsystem.destroy(handle);
            return Err(BindError::ControllerRegistration { port, source });
        }

        ctx.store_port(port, handle);
        info!("channel #{} at {:#x}, irq {}", port + 1, base, irq);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer;
    use advcan_common::can::accessor::AccessorKind;
    use advcan_common::can::error::SubsystemError;
    use advcan_common::can::profile;

    use crate::sim::{SimBus, SimSubsystem};

    fn acquired(device_id: u16, bus: &Arc<SimBus>) -> (&'static BoardProfile, CardContext) {
        let p = profile::lookup(device_id).unwrap();
        let mut ctx = CardContext::new(p.ports);
        let dyn_bus: &dyn CanBus = bus.as_ref();
        sequencer::acquire(dyn_bus, p, &mut ctx).unwrap();
        (p, ctx)
    }

    #[test]
    fn all_ports_bound_and_configured() {
        let bus = Arc::new(SimBus::new(0xc304));
        let subsystem = SimSubsystem::new();
        let (p, mut ctx) = acquired(0xc304, &bus);

        let dyn_bus: Arc<dyn CanBus> = bus.clone();
        instantiate(&dyn_bus, &subsystem, p, &mut ctx).unwrap();

        assert_eq!(ctx.bound_ports(), 4);
        for (port, config) in subsystem.registered_configs() {
            assert_eq!(config.clock_hz, CAN_CLOCK_HZ);
            assert_eq!(config.ocr, BOARD_OCR);
            assert_eq!(config.cdr, BOARD_CDR);
            assert!(config.irq_flags.contains(IrqFlags::SHARED));
            assert_eq!(config.irq, bus.irq());
            match config.accessor.kind() {
                AccessorKind::MemoryMapped { stride, port: p, .. } => {
                    assert_eq!(stride, 0x400);
                    assert_eq!(p, port as u64);
                }
                other => panic!("expected memory-mapped accessor, got {other:?}"),
            }
        }
    }

    #[test]
    fn registration_failure_discards_partial_controller() {
        let bus = Arc::new(SimBus::new(0xc302));
        let subsystem = SimSubsystem::new();
        subsystem.fail_register(1);
        let (p, mut ctx) = acquired(0xc302, &bus);

        let dyn_bus: Arc<dyn CanBus> = bus.clone();
        let err = instantiate(&dyn_bus, &subsystem, p, &mut ctx).unwrap_err();

        assert!(matches!(
            err,
            BindError::ControllerRegistration {
                port: 1,
                source: SubsystemError::RegistrationRejected(_)
            }
        ));
        // Port 0 stays registered for the caller's teardown; port 1's
        // partial controller was destroyed and never stored.
        assert_eq!(ctx.bound_ports(), 1);
        assert_eq!(subsystem.live_controllers(), 1);
    }
}
