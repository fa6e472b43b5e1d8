//! CAN adapter shared types and external seams.
//!
//! This module contains everything the binding manager and its
//! collaborators agree on: the static board profile table, the register
//! accessor bound into each sub-controller, the `CanBus` and
//! `ControllerSubsystem` traits, the error taxonomy and the board-family
//! constants.

pub mod accessor;
pub mod bus;
pub mod consts;
pub mod error;
pub mod profile;
pub mod subsystem;
