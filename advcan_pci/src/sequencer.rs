//! Resource acquisition sequencer.
//!
//! Acquires the bus resource regions a board profile calls for,
//! recording every successful step into the `CardContext` immediately so
//! a later failure knows exactly what to release. The sequencer itself
//! never rolls back more than the step in flight; full unwinding is the
//! caller's job via `CardContext::teardown()`.

use crate::card::CardContext;
use advcan_common::can::bus::CanBus;
use advcan_common::can::error::BindError;
use advcan_common::can::profile::{AccessStrategy, BoardProfile};
use tracing::{debug, warn};

/// Acquire the regions `profile` declares, recording into `ctx`.
///
/// Port-addressed: reserve each declared region in ascending index
/// order, stopping at the first failure. Memory-mapped: reserve the
/// single region and map it; if the mapping fails the just-reserved
/// region is released before the error is reported, so no half-acquired
/// region is ever stored. Finally MSI delivery is attempted best-effort;
/// failure is logged and the bind proceeds in line-interrupt mode.
///
/// # Errors
/// `ResourceReservation` or `ResourceMapping` with the failing region.
/// On error `ctx` holds exactly the regions acquired before the failure.
pub fn acquire(bus: &dyn CanBus, profile: &BoardProfile, ctx: &mut CardContext) -> Result<(), BindError> {
    match &profile.access {
        AccessStrategy::PortAddressed { .. } => {
            for bar in profile.bars() {
                bus.reserve_region(bar)
                    .map_err(|source| BindError::ResourceReservation { bar, source })?;
                debug!("reserved I/O region {} at {:#x}", bar, bus.region_base(bar));
                ctx.push_region(bar, None);
            }
        }
        AccessStrategy::MemoryMapped { bar, .. } => {
            let bar = *bar;
            bus.reserve_region(bar)
                .map_err(|source| BindError::ResourceReservation { bar, source })?;
            match bus.map_region(bar) {
                Ok(addr) => {
                    debug!("mapped region {} at {:#x}", bar, addr);
                    ctx.push_region(bar, Some(addr));
                }
                Err(source) => {
                    bus.release_region(bar);
                    return Err(BindError::ResourceMapping { bar, source });
                }
            }
        }
    }

    match bus.enable_msi() {
        Ok(()) => {
            debug!("MSI delivery enabled");
            ctx.set_msi_enabled();
        }
        Err(e) => {
            // Non-fatal: the card works on the shared interrupt line.
            warn!("MSI unavailable ({e}), using line interrupts");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBus;
    use advcan_common::can::error::BusError;
    use advcan_common::can::profile;

    #[test]
    fn mapping_failure_releases_the_reservation() {
        let bus = SimBus::new(0xc302);
        bus.fail_map(0);

        let p = profile::lookup(0xc302).unwrap();
        let mut ctx = CardContext::new(p.ports);
        let err = acquire(&bus, p, &mut ctx).unwrap_err();

        assert_eq!(
            err,
            BindError::ResourceMapping {
                bar: 0,
                source: BusError::MapFailed(0)
            }
        );
        assert!(ctx.regions().is_empty(), "no half-acquired region stored");
        assert!(bus.reserved_regions().is_empty());
    }

    #[test]
    fn msi_failure_is_swallowed() {
        let bus = SimBus::new(0xc302);
        bus.fail_msi();

        let p = profile::lookup(0xc302).unwrap();
        let mut ctx = CardContext::new(p.ports);
        acquire(&bus, p, &mut ctx).expect("bind must proceed without MSI");
        assert!(!bus.msi_enabled());
        assert_eq!(ctx.regions().len(), 1);
    }

    #[test]
    fn port_addressed_records_up_to_the_failure() {
        let bus = SimBus::new(0x1684);
        bus.fail_reserve(2);

        let p = profile::lookup(0x1684).unwrap();
        let mut ctx = CardContext::new(p.ports);
        let err = acquire(&bus, p, &mut ctx).unwrap_err();

        assert_eq!(
            err,
            BindError::ResourceReservation {
                bar: 2,
                source: BusError::RegionBusy(2)
            }
        );
        let bars: Vec<usize> = ctx.regions().iter().map(|r| r.bar).collect();
        assert_eq!(bars, vec![0, 1]);
    }
}
