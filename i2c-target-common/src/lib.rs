//! Portable I2C target (peripheral mode) protocol engine
//!
//! This library contains the hardware independent half of an I2C target driver:
//! the protocol state machine, the optional memory-buffer (EEPROM style) emulation
//! and the IRQ subscription contract. It is shared by the port bindings in
//! `i2c-target-hal`.
//!
//! You shouldn't include anything here which requires either the `cortex-m`
//! crate, or a PAC.
//!
//! # Model
//!
//! A port binding decodes a hardware interrupt and reports it to the protocol core
//! through a [`Dispatcher`] as one of four semantic calls:
//! [`addr_match`](Dispatcher::addr_match), [`read_request`](Dispatcher::read_request),
//! [`write_request`](Dispatcher::write_request) and
//! [`restart_or_stop`](Dispatcher::restart_or_stop) / [`stop`](Dispatcher::stop).
//! The core advances its state, optionally moves a byte between the bound memory
//! buffer and the hardware through [`TargetPort`], and invokes the user handler for
//! every event selected by its [`Trigger`] mask.
//!
//! All of this runs synchronously in interrupt context. Nothing here blocks or
//! allocates.
//!
//! # Crate features
//!
//! * **defmt** -
//!   Implement `defmt::Format` for several types and route log output to defmt.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

#[macro_use]
pub mod log;

pub mod config;
pub mod error;
pub mod irq;
pub mod port;
pub mod registry;
pub mod shared;
pub mod target;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use config::{Config, MemAddrSize, ValidAddress};
pub use error::{Error, HandlerError};
pub use irq::{Handler, Irq, IrqContext};
pub use port::TargetPort;
pub use registry::{Dispatcher, Target, TargetRegistry};
pub use shared::SharedRegistry;
pub use target::{State, TargetData};
pub use trigger::Trigger;
