//! # Advcan PCI Binding Manager
//!
//! Binds multi-port Advantech PCI CAN adapter cards to the generic CAN
//! controller core. Given a discovered device, the binding manager
//! resolves its board profile, acquires the resource regions the profile
//! calls for, instantiates one sub-controller per port with the right
//! register accessor, and guarantees that any failure unwinds everything
//! built so far in reverse order, exactly once.
//!
//! # Module Structure
//!
//! - [`core`] - `CardBinder`, the bind/remove orchestrator
//! - [`card`] - `CardContext` ownership record and the teardown engine
//! - [`sequencer`] - Resource acquisition per board profile
//! - [`ports`] - Per-port sub-controller instantiation loop
//! - [`sim`] - Simulated bus and controller subsystem backends
//! - [`scenario`] - TOML scenario config for the CLI
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      advcan_pci                                │
//! │  ┌────────────┐     ┌──────────────┐     ┌──────────────────┐  │
//! │  │ profile    │────►│  CardBinder  │◄───►│  CardContext     │  │
//! │  │ (common)   │     │  bind/remove │     │  + teardown      │  │
//! │  └────────────┘     └──────┬───────┘     └──────────────────┘  │
//! │                           │                                    │
//! │              ┌────────────┴────────────┐                       │
//! │              ▼                         ▼                       │
//! │      ┌──────────────┐         ┌──────────────────────┐         │
//! │      │  CanBus      │         │  ControllerSubsystem │         │
//! │      │  (trait)     │         │  (trait)             │         │
//! │      └──────────────┘         └──────────────────────┘         │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod card;
pub mod core;
pub mod ports;
pub mod scenario;
pub mod sequencer;
pub mod sim;

// Re-export key types for convenience
pub use crate::card::CardContext;
pub use crate::core::CardBinder;
