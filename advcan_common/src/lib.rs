//! Advcan Common Library
//!
//! This crate provides the shared types and trait seams for the advcan
//! workspace: the board profile table, the register accessor, and the
//! traits through which the binding manager talks to the PCI bus layer
//! and the CAN controller subsystem.
//!
//! # Module Structure
//!
//! - [`can`] - Board profiles, register access, bus and subsystem traits
//!
//! # Usage
//!
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! advcan_common = { path = "../advcan_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use advcan_common::can::profile;
//! use advcan_common::can::consts::*;
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod can;
