//! Simulated bus and controller subsystem.
//!
//! Software stand-ins for the PCI bus layer and the controller core,
//! used for development, the CLI, and the binding tests. Both record
//! every lifecycle call into a shared [`EventLog`] so tests can assert
//! ordering across the two seams (for example that every sub-controller
//! is unregistered before any region is released), and both take
//! injectable failure points for exercising the rollback paths.

mod bus;
mod subsystem;

pub use bus::SimBus;
pub use subsystem::SimSubsystem;

use std::sync::Mutex;

/// One recorded lifecycle call.
///
/// Only successful operations and teardown calls are recorded; register
/// byte traffic is not, it would swamp the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// Region reserved.
    Reserve(usize),
    /// Region reservation released.
    Release(usize),
    /// Region mapped.
    Map(usize),
    /// Region mapping removed.
    Unmap(usize),
    /// MSI delivery enabled.
    MsiEnable,
    /// MSI delivery disabled.
    MsiDisable,
    /// Controller instance allocated.
    Create(u64),
    /// Controller registered for a port.
    Register {
        /// 0-based port index.
        port: usize,
    },
    /// Controller unregistered from a port.
    Unregister {
        /// 0-based port index.
        port: usize,
    },
    /// Controller instance freed.
    Destroy(u64),
}

/// Ordered log of lifecycle calls, shared between [`SimBus`] and
/// [`SimSubsystem`].
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<SimEvent>>,
}

impl EventLog {
    /// Append one event.
    pub fn record(&self, event: SimEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Drain and return everything recorded so far.
    pub fn take(&self) -> Vec<SimEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Copy of everything recorded so far, without draining.
    pub fn snapshot(&self) -> Vec<SimEvent> {
        self.events.lock().unwrap().clone()
    }
}
