//! Simulated controller subsystem.

use super::{EventLog, SimEvent};
use advcan_common::can::error::SubsystemError;
use advcan_common::can::subsystem::{ControllerConfig, ControllerHandle, ControllerSubsystem};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Debug, Default)]
struct SimController {
    config: Option<ControllerConfig>,
    registered: bool,
}

#[derive(Default)]
struct SimSubsystemState {
    next_id: u64,
    creates_seen: usize,
    controllers: HashMap<u64, SimController>,
    fail_register_ports: BTreeSet<usize>,
    fail_create_at: Option<usize>,
}

/// In-memory `ControllerSubsystem` implementation with injectable
/// failures.
pub struct SimSubsystem {
    log: Arc<EventLog>,
    state: Mutex<SimSubsystemState>,
}

impl SimSubsystem {
    /// Empty subsystem with its own event log.
    pub fn new() -> Self {
        Self {
            log: Arc::new(EventLog::default()),
            state: Mutex::new(SimSubsystemState::default()),
        }
    }

    /// Attach a (possibly shared) event log.
    pub fn with_log(mut self, log: Arc<EventLog>) -> Self {
        self.log = log;
        self
    }

    /// Make `register()` fail for controllers configured with `port`.
    pub fn fail_register(&self, port: usize) {
        self.state.lock().unwrap().fail_register_ports.insert(port);
    }

    /// Make the `n`-th `create_controller()` call (0-based) fail.
    pub fn fail_create_at(&self, n: usize) {
        self.state.lock().unwrap().fail_create_at = Some(n);
    }

    /// Number of controller instances currently allocated.
    pub fn live_controllers(&self) -> usize {
        self.state.lock().unwrap().controllers.len()
    }

    /// Number of currently registered controllers.
    pub fn registered_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .controllers
            .values()
            .filter(|c| c.registered)
            .count()
    }

    /// `(port, config)` of every registered controller, by port.
    pub fn registered_configs(&self) -> Vec<(usize, ControllerConfig)> {
        let state = self.state.lock().unwrap();
        let mut configs: Vec<(usize, ControllerConfig)> = state
            .controllers
            .values()
            .filter(|c| c.registered)
            .filter_map(|c| c.config.clone())
            .map(|config| (config.port, config))
            .collect();
        configs.sort_by_key(|(port, _)| *port);
        configs
    }
}

impl Default for SimSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerSubsystem for SimSubsystem {
    fn create_controller(&self) -> Result<ControllerHandle, SubsystemError> {
        let mut state = self.state.lock().unwrap();
        let call = state.creates_seen;
        state.creates_seen += 1;
        if state.fail_create_at == Some(call) {
            return Err(SubsystemError::OutOfMemory);
        }
        let id = state.next_id;
        state.next_id += 1;
        state.controllers.insert(id, SimController::default());
        self.log.record(SimEvent::Create(id));
        Ok(ControllerHandle(id))
    }

    fn configure(&self, handle: ControllerHandle, config: ControllerConfig) {
        let mut state = self.state.lock().unwrap();
        match state.controllers.get_mut(&handle.0) {
            Some(ctrl) => ctrl.config = Some(config),
            None => warn!("configure of unknown controller {}", handle.0),
        }
    }

    fn register(&self, handle: ControllerHandle) -> Result<(), SubsystemError> {
        let mut state = self.state.lock().unwrap();
        let port = state
            .controllers
            .get(&handle.0)
            .and_then(|c| c.config.as_ref())
            .map(|c| c.port)
            .ok_or_else(|| {
                SubsystemError::RegistrationRejected("controller not configured".to_string())
            })?;
        if state.fail_register_ports.contains(&port) {
            return Err(SubsystemError::RegistrationRejected(format!(
                "injected failure on port {port}"
            )));
        }
        state
            .controllers
            .get_mut(&handle.0)
            .expect("checked above")
            .registered = true;
        self.log.record(SimEvent::Register { port });
        Ok(())
    }

    fn unregister(&self, handle: ControllerHandle) {
        let mut state = self.state.lock().unwrap();
        match state.controllers.get_mut(&handle.0) {
            Some(ctrl) if ctrl.registered => {
                ctrl.registered = false;
                let port = ctrl.config.as_ref().map(|c| c.port).unwrap_or(usize::MAX);
                self.log.record(SimEvent::Unregister { port });
            }
            Some(_) => warn!("unregister of unregistered controller {}", handle.0),
            None => warn!("unregister of unknown controller {}", handle.0),
        }
    }

    fn destroy(&self, handle: ControllerHandle) {
        let mut state = self.state.lock().unwrap();
        if state.controllers.remove(&handle.0).is_none() {
            warn!("destroy of unknown controller {}", handle.0);
            return;
        }
        self.log.record(SimEvent::Destroy(handle.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_failure_injection_hits_the_nth_call() {
        let subsystem = SimSubsystem::new();
        subsystem.fail_create_at(1);

        assert!(subsystem.create_controller().is_ok());
        assert_eq!(
            subsystem.create_controller(),
            Err(SubsystemError::OutOfMemory)
        );
        assert!(subsystem.create_controller().is_ok());
        assert_eq!(subsystem.live_controllers(), 2);
    }

    #[test]
    fn register_requires_configuration() {
        let subsystem = SimSubsystem::new();
        let handle = subsystem.create_controller().unwrap();
        assert!(matches!(
            subsystem.register(handle),
            Err(SubsystemError::RegistrationRejected(_))
        ));
    }
}
