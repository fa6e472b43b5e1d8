//! Error types for adapter binding.
//!
//! This module defines:
//! - `BindError` - The single failure surface of a bind attempt
//! - `BusError` - Errors reported by the PCI bus layer
//! - `SubsystemError` - Errors reported by the controller subsystem

use thiserror::Error;

/// Errors reported by the PCI bus layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The resource region is already reserved by someone else.
    #[error("region {0} is busy")]
    RegionBusy(usize),

    /// Mapping the region into addressable space failed.
    #[error("region {0} could not be mapped")]
    MapFailed(usize),

    /// The device or platform does not support MSI delivery.
    #[error("MSI not supported")]
    MsiUnsupported,
}

/// Errors reported by the controller subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubsystemError {
    /// Controller allocation failed.
    #[error("out of memory")]
    OutOfMemory,

    /// The subsystem refused to register the controller.
    #[error("registration rejected: {0}")]
    RegistrationRejected(String),
}

/// Failure surface of a bind attempt.
///
/// Every variant is fatal to the bind: the binding manager tears down
/// whatever was built so far and returns the triggering cause unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The device ID is not in the board profile table.
    #[error("unsupported board: device id {0:#06x}")]
    UnknownBoard(u16),

    /// Reserving a resource region failed.
    #[error("reserving region {bar} failed: {source}")]
    ResourceReservation {
        /// Region (BAR) index that could not be reserved.
        bar: usize,
        /// Bus-layer cause.
        source: BusError,
    },

    /// Mapping a reserved region failed.
    #[error("mapping region {bar} failed: {source}")]
    ResourceMapping {
        /// Region (BAR) index that could not be mapped.
        bar: usize,
        /// Bus-layer cause.
        source: BusError,
    },

    /// Allocating a sub-controller failed.
    #[error("allocating controller for port {port} failed: {source}")]
    ControllerAllocation {
        /// Port index the allocation was for.
        port: usize,
        /// Subsystem cause.
        source: SubsystemError,
    },

    /// Registering a sub-controller with the subsystem failed.
    #[error("registering controller for port {port} failed: {source}")]
    ControllerRegistration {
        /// Port index the registration was for.
        port: usize,
        /// Subsystem cause.
        source: SubsystemError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        let err = BindError::UnknownBoard(0xc299);
        assert!(err.to_string().contains("0xc299"));

        let err = BindError::ResourceReservation {
            bar: 2,
            source: BusError::RegionBusy(2),
        };
        assert!(err.to_string().contains("region 2"));

        let err = BindError::ControllerRegistration {
            port: 3,
            source: SubsystemError::RegistrationRejected("no carrier".to_string()),
        };
        assert!(err.to_string().contains("port 3"));
        assert!(err.to_string().contains("no carrier"));
    }
}
