//! Scenario configuration for the CLI.
//!
//! A scenario TOML describes the simulated devices to bind and which
//! failures to inject, e.g.:
//!
//! ```toml
//! [[device]]
//! device_id = 0xc302
//!
//! [[device]]
//! device_id = 0x3680
//! irq = 10
//! fail_reserve = [2]
//! ```

use crate::sim::{EventLog, SimBus, SimSubsystem};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Scenario file errors.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The file could not be read.
    #[error("failed to read scenario {path}: {message}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },

    /// The file is not valid scenario TOML.
    #[error("failed to parse scenario: {0}")]
    Parse(String),
}

/// One simulated device in a scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSpec {
    /// PCI device ID.
    pub device_id: u16,

    /// Interrupt line override.
    #[serde(default)]
    pub irq: Option<u32>,

    /// Regions whose reservation should fail.
    #[serde(default)]
    pub fail_reserve: Vec<usize>,

    /// Regions whose mapping should fail.
    #[serde(default)]
    pub fail_map: Vec<usize>,

    /// Make MSI enablement fail (bind still succeeds).
    #[serde(default)]
    pub fail_msi: bool,

    /// Port whose controller registration should fail.
    #[serde(default)]
    pub fail_register_port: Option<usize>,

    /// 0-based `create_controller()` call that should fail.
    #[serde(default)]
    pub fail_create_call: Option<usize>,
}

impl DeviceSpec {
    /// Build the simulated bus and subsystem for this device, sharing
    /// `log`, with all configured failures injected.
    pub fn build(&self, log: Arc<EventLog>) -> (Arc<SimBus>, Arc<SimSubsystem>) {
        let mut bus = SimBus::new(self.device_id).with_log(log.clone());
        if let Some(irq) = self.irq {
            bus = bus.with_irq(irq);
        }
        for &bar in &self.fail_reserve {
            bus.fail_reserve(bar);
        }
        for &bar in &self.fail_map {
            bus.fail_map(bar);
        }
        if self.fail_msi {
            bus.fail_msi();
        }

        let subsystem = SimSubsystem::new().with_log(log);
        if let Some(port) = self.fail_register_port {
            subsystem.fail_register(port);
        }
        if let Some(call) = self.fail_create_call {
            subsystem.fail_create_at(call);
        }

        (Arc::new(bus), Arc::new(subsystem))
    }
}

/// A parsed scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Devices to bind, in order.
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceSpec>,
}

impl Scenario {
    /// Parse a scenario from TOML text.
    ///
    /// # Errors
    /// Returns `ScenarioError::Parse` on malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, ScenarioError> {
        toml::from_str(content).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    /// Load a scenario from a file.
    ///
    /// # Errors
    /// Returns `ScenarioError::Io` if the file cannot be read, or
    /// `ScenarioError::Parse` if it is malformed.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|e| ScenarioError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_scenario_with_failures() {
        let scenario = Scenario::from_toml(
            r#"
            [[device]]
            device_id = 0xc302

            [[device]]
            device_id = 0x3680
            irq = 10
            fail_reserve = [2]
            fail_msi = true
            "#,
        )
        .expect("valid scenario");

        assert_eq!(scenario.devices.len(), 2);
        assert_eq!(scenario.devices[0].device_id, 0xc302);
        assert!(scenario.devices[0].fail_reserve.is_empty());
        assert_eq!(scenario.devices[1].irq, Some(10));
        assert_eq!(scenario.devices[1].fail_reserve, vec![2]);
        assert!(scenario.devices[1].fail_msi);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Scenario::from_toml("[[device]]\nno_such_id = true"),
            Err(ScenarioError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[[device]]\ndevice_id = 0xc204").unwrap();

        let scenario = Scenario::load(file.path()).expect("load scenario");
        assert_eq!(scenario.devices.len(), 1);
        assert_eq!(scenario.devices[0].device_id, 0xc204);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Scenario::load(Path::new("/nonexistent/scenario.toml")).unwrap_err();
        assert!(matches!(err, ScenarioError::Io { .. }));
    }
}
