//! Card binder - the bind/remove orchestrator.
//!
//! `CardBinder` drives the whole state machine for one device:
//!
//! ```text
//! Unbound ──► AcquiringResources ──► InstantiatingPorts ──► Bound
//!                    │                      │                 │
//!                    └── failure ───────────┴──► teardown ◄───┘ remove()
//! ```
//!
//! Both failure legs and removal run the identical reverse-drain in
//! `CardContext::teardown()`, so a failed bind always leaves the system
//! exactly as it was before the attempt.

use crate::card::CardContext;
use crate::{ports, sequencer};
use advcan_common::can::bus::CanBus;
use advcan_common::can::consts::ADVANTECH_VENDOR_ID;
use advcan_common::can::error::BindError;
use advcan_common::can::profile;
use advcan_common::can::subsystem::ControllerSubsystem;
use std::sync::Arc;
use tracing::{info, warn};

/// Binding manager for one discovered PCI device.
///
/// The bus layer serializes bind and remove per device, so the binder
/// holds no internal locking; it owns at most one `CardContext` at a
/// time and is the only owner of everything that context records.
pub struct CardBinder {
    bus: Arc<dyn CanBus>,
    subsystem: Arc<dyn ControllerSubsystem>,
    context: Option<CardContext>,
}

impl CardBinder {
    /// Create a binder for the device behind `bus`.
    pub fn new(bus: Arc<dyn CanBus>, subsystem: Arc<dyn ControllerSubsystem>) -> Self {
        Self {
            bus,
            subsystem,
            context: None,
        }
    }

    /// Bind the device: resolve its profile, acquire resources and
    /// register one sub-controller per port.
    ///
    /// On any failure everything built so far is torn down in reverse
    /// order before the triggering error is returned, leaving the
    /// pre-bind state.
    ///
    /// # Panics
    /// Panics if called while already bound; the bus layer never does.
    pub fn bind(&mut self) -> Result<(), BindError> {
        assert!(self.context.is_none(), "bind called while already bound");

        let device_id = self.bus.device_id();
        if self.bus.vendor_id() != ADVANTECH_VENDOR_ID {
            warn!(
                "device {:#06x} has foreign vendor {:#06x}, refusing bind",
                device_id,
                self.bus.vendor_id()
            );
            return Err(BindError::UnknownBoard(device_id));
        }
        let profile = profile::lookup(device_id).ok_or(BindError::UnknownBoard(device_id))?;
        info!(
            "binding {} (device {:#06x}, {} port(s))",
            profile.name, device_id, profile.ports
        );

        let mut ctx = CardContext::new(profile.ports);
        let result = sequencer::acquire(self.bus.as_ref(), profile, &mut ctx).and_then(|()| {
            ports::instantiate(&self.bus, self.subsystem.as_ref(), profile, &mut ctx)
        });

        if let Err(err) = result {
            warn!("bind failed ({err}), rolling back");
            ctx.teardown(self.bus.as_ref(), self.subsystem.as_ref());
            return Err(err);
        }

        info!("{} bound", profile.name);
        self.context = Some(ctx);
        Ok(())
    }

    /// Remove a bound device.
    ///
    /// Runs the full teardown engine; never fails, and is a no-op when
    /// nothing is bound.
    pub fn remove(&mut self) {
        if let Some(mut ctx) = self.context.take() {
            info!("removing device {:#06x}", self.bus.device_id());
            ctx.teardown(self.bus.as_ref(), self.subsystem.as_ref());
        }
    }

    /// Whether the device is currently bound.
    pub fn is_bound(&self) -> bool {
        self.context.is_some()
    }

    /// The bound card's context, for diagnostics.
    pub fn context(&self) -> Option<&CardContext> {
        self.context.as_ref()
    }
}

impl Drop for CardBinder {
    fn drop(&mut self) {
        self.remove();
    }
}
