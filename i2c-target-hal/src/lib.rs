//! I2C target (peripheral mode) bindings
//!
//! Each module binds the protocol engine of [`i2c_target_common`] to one family of
//! I2C controllers:
//!
//! * [`designware`] - the Synopsys DesignWare APB I2C block, shared by [`alif`]
//!   and [`rp2`].
//! * [`stm32`] - the STM32 I2C v2 peripheral.
//! * [`zephyr`] - the generic Zephyr `i2c_target` callback driver model.
//!
//! A binding decodes the controller's interrupt and forwards it to the
//! [`Dispatcher`](i2c_target_common::Dispatcher) of the instance, so the same state
//! machine and IRQ contract apply everywhere.
//!
//! ```no_run
//! use i2c_target_hal::{
//!     alif::{self, Board},
//!     designware::{self, DesignWarePort},
//!     mmio::Mmio,
//!     Config, SharedRegistry,
//! };
//!
//! static TARGETS: SharedRegistry<'static, DesignWarePort<Mmio>, 4> = SharedRegistry::new();
//!
//! const BOARD: Board = Board {
//!     pins: [Some((31, 30)), None, None, None],
//! };
//!
//! fn irq_off(_: bool) {}
//!
//! let mem: &'static mut [u8] = {
//!     static mut MEM: [u8; 16] = [0; 16];
//!     unsafe { &mut *core::ptr::addr_of_mut!(MEM) }
//! };
//! // SAFETY: the I2C0 register block is not used anywhere else.
//! let regs = unsafe { Mmio::new(0x4901_0000 as *mut u32, irq_off) };
//! TARGETS
//!     .with(|reg| alif::init(reg, &BOARD, 0, regs, Config::new(0x43u8).with_mem(mem)))
//!     .unwrap();
//!
//! // In the I2C0 interrupt handler:
//! TARGETS.with(|reg| designware::on_interrupt(reg, 0)).unwrap();
//! ```
//!
//! # Crate features
//!
//! * **defmt** -
//!   Implement `defmt::Format` for several types and log through defmt.
//! * **rp2040** -
//!   PAC register blocks and interrupt lines of the RP2040 I2C controllers.
//! * **rp235x** -
//!   PAC register blocks and interrupt lines of the RP235x I2C controllers.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub use i2c_target_common::{
    Config, Dispatcher, Error, Handler, HandlerError, Irq, IrqContext, SharedRegistry, State,
    Target, TargetPort, TargetRegistry, Trigger,
};

pub mod alif;
pub mod designware;
pub mod mmio;
pub mod rp2;
pub mod stm32;
pub mod zephyr;

#[cfg(test)]
mod testing;
