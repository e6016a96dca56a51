//! # STM32 I2C target
//!
//! The controller driver of the STM32 I2C v2 peripheral reports five events:
//! address match, byte received, receive end, byte to transmit and transmit end.
//! Each maps onto one protocol call, see the `process_*` functions.
//!
//! Buses are numbered from 1 like in the reference manuals, and boards may give
//! them names. Pins are fixed by the board.

use core::{fmt, mem};

use i2c_target_common::{
    debug, Config, Dispatcher, Error, HandlerError, TargetPort, TargetRegistry, Trigger,
    ValidAddress,
};

use crate::mmio::Mmio;

/// Number of I2C controllers.
pub const NUM_INSTANCES: usize = 4;

/// I2C v2 registers used by the target driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum Reg {
    /// Control register 1
    Cr1 = 0x00,
    /// Own address 1 register
    Oar1 = 0x08,
    /// Interrupt and status register
    Isr = 0x18,
    /// Interrupt clear register
    Icr = 0x1c,
    /// Receive data register
    Rxdr = 0x24,
    /// Transmit data register
    Txdr = 0x28,
}

bitflags::bitflags! {
    /// ISR flags; the clearable ones share their position with their ICR bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Isr: u32 {
        /// TXDR empty. Writing it flushes TXDR.
        const TXE = 1 << 0;
        /// TXDR must be written.
        const TXIS = 1 << 1;
        /// RXDR holds a byte.
        const RXNE = 1 << 2;
        /// Own address matched.
        const ADDR = 1 << 3;
        /// NACK received.
        const NACKF = 1 << 4;
        /// Stop condition.
        const STOPF = 1 << 5;
        /// Bus error.
        const BERR = 1 << 8;
        /// Arbitration lost.
        const ARLO = 1 << 9;
        /// Overrun or underrun.
        const OVR = 1 << 10;
        /// Transfer direction of the last address match, set for a read.
        const DIR = 1 << 16;
    }
}

const ERRORS: Isr = Isr::BERR.union(Isr::ARLO).union(Isr::OVR);

/// CR1: peripheral enable.
pub const CR1_PE: u32 = 1 << 0;
/// CR1: interrupt enables used by the target driver.
pub const CR1_TARGET_IE: u32 = 1 << 1 // TXIE
    | 1 << 2 // RXIE
    | 1 << 3 // ADDRIE
    | 1 << 4 // NACKIE
    | 1 << 5 // STOPIE
    | 1 << 7; // ERRIE

/// OAR1: 10 bit own address.
pub const OAR1_OA1MODE: u32 = 1 << 10;
/// OAR1: own address enable.
pub const OAR1_OA1EN: u32 = 1 << 15;

/// Access to one I2C v2 peripheral
pub trait I2cV2 {
    /// Reads a register.
    fn read(&mut self, reg: Reg) -> u32;

    /// Writes a register.
    fn write(&mut self, reg: Reg, val: u32);

    /// Enables or disables the event interrupt line.
    fn set_irq_enabled(&mut self, enabled: bool);
}

impl<T: I2cV2 + ?Sized> I2cV2 for &mut T {
    fn read(&mut self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Reg, val: u32) {
        (**self).write(reg, val)
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        (**self).set_irq_enabled(enabled)
    }
}

impl I2cV2 for Mmio {
    fn read(&mut self, reg: Reg) -> u32 {
        Mmio::read(self, reg as usize)
    }

    fn write(&mut self, reg: Reg, val: u32) {
        Mmio::write(self, reg as usize, val)
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        Mmio::set_irq_enabled(self, enabled)
    }
}

/// Identifies a bus by number or by board name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusId<'a> {
    /// 1-based bus number.
    Number(usize),
    /// Name given by the board.
    Name(&'a str),
}

impl From<usize> for BusId<'_> {
    fn from(n: usize) -> Self {
        BusId::Number(n)
    }
}

impl<'a> From<&'a str> for BusId<'a> {
    fn from(name: &'a str) -> Self {
        BusId::Name(name)
    }
}

/// Which buses a board wires up, and their names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    /// Whether bus `n + 1` is available.
    pub present: [bool; NUM_INSTANCES],
    /// Optional name of bus `n + 1`.
    pub names: [Option<&'static str>; NUM_INSTANCES],
}

impl Board {
    /// Resolves `id` to a 0-based controller index.
    pub fn resolve(&self, id: BusId<'_>) -> Result<usize, Error> {
        match id {
            BusId::Number(n) if (1..=NUM_INSTANCES).contains(&n) && self.present[n - 1] => {
                Ok(n - 1)
            }
            BusId::Number(n) => Err(Error::InvalidId(n)),
            BusId::Name(name) => self
                .names
                .iter()
                .zip(self.present)
                .position(|(n, present)| present && *n == Some(name))
                .ok_or(Error::UnknownBus),
        }
    }
}

/// An I2C v2 peripheral configured as a target
pub struct Stm32Port<R> {
    index: usize,
    regs: R,
    addr: u16,
    // The transfer already ended on a NACK, the next STOPF closes nothing.
    nacked: bool,
}

impl<R: I2cV2> Stm32Port<R> {
    /// Enables the peripheral as a target at `addr`.
    pub fn configure(index: usize, mut regs: R, addr: u16, ten_bit: bool) -> Self {
        // Clearing PE also clears every flag.
        regs.write(Reg::Cr1, 0);
        regs.write(Reg::Oar1, 0);
        let oar1 = if ten_bit {
            OAR1_OA1MODE | u32::from(addr)
        } else {
            u32::from(addr) << 1
        };
        regs.write(Reg::Oar1, OAR1_OA1EN | oar1);
        regs.write(Reg::Cr1, CR1_TARGET_IE | CR1_PE);
        regs.set_irq_enabled(true);

        debug!("i2c target {}: stm32 peripheral enabled", index + 1);
        Self {
            index,
            regs,
            addr,
            nacked: false,
        }
    }

    /// 0-based controller index, as used in the registry.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Own address as configured.
    pub fn addr(&self) -> u16 {
        self.addr
    }

    /// The register block.
    pub fn regs(&mut self) -> &mut R {
        &mut self.regs
    }

    fn clear(&mut self, flags: Isr) {
        self.regs.write(Reg::Icr, flags.bits());
    }
}

impl<R: I2cV2> TargetPort for Stm32Port<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        match buf.first_mut() {
            Some(b) => {
                *b = self.regs.read(Reg::Rxdr) as u8;
                1
            }
            None => 0,
        }
    }

    fn write_bytes(&mut self, buf: &[u8]) -> usize {
        match buf.first() {
            Some(&b) => {
                self.regs.write(Reg::Txdr, u32::from(b));
                1
            }
            None => 0,
        }
    }

    fn irq_config(&mut self, _trigger: Trigger) {}

    fn deinit(&mut self) {
        self.regs.set_irq_enabled(false);
        self.regs.write(Reg::Cr1, 0);
        self.nacked = false;
        debug!("i2c target {}: stm32 peripheral disabled", self.index + 1);
    }
}

impl<R> fmt::Display for Stm32Port<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I2CTarget({}, addr={})", self.index + 1, self.addr)
    }
}

/// The controller matched our address, `read` giving the direction.
pub fn process_addr_match<P: TargetPort>(
    target: &mut Dispatcher<'_, '_, P>,
    read: bool,
) -> Result<(), HandlerError> {
    target.addr_match(read)
}

/// A byte was received.
pub fn process_rx_byte<P: TargetPort>(
    target: &mut Dispatcher<'_, '_, P>,
) -> Result<(), HandlerError> {
    target.write_request()
}

/// The controller ended a write.
pub fn process_rx_end<P: TargetPort>(
    target: &mut Dispatcher<'_, '_, P>,
) -> Result<(), HandlerError> {
    target.stop()
}

/// The controller wants the next byte.
pub fn process_tx_byte<P: TargetPort>(
    target: &mut Dispatcher<'_, '_, P>,
) -> Result<(), HandlerError> {
    target.read_request()
}

/// The controller ended a read.
pub fn process_tx_end<P: TargetPort>(
    target: &mut Dispatcher<'_, '_, P>,
) -> Result<(), HandlerError> {
    target.stop()
}

/// Services the event and error interrupts of controller `index`.
///
/// Bus errors are acknowledged and otherwise ignored.
pub fn on_interrupt<R: I2cV2, const N: usize>(
    registry: &mut TargetRegistry<'_, Stm32Port<R>, N>,
    index: usize,
) -> Result<(), HandlerError> {
    let Some(mut target) = registry.dispatcher(index) else {
        return Ok(());
    };
    let isr = Isr::from_bits_retain(target.port().regs.read(Reg::Isr));

    let errors = isr & ERRORS;
    if !errors.is_empty() {
        target.port().clear(errors);
    }

    if isr.contains(Isr::ADDR) {
        let port = target.port();
        // Flush TXDR so the first byte of a read comes from this transfer.
        port.regs.write(Reg::Isr, Isr::TXE.bits());
        port.clear(Isr::ADDR);
        port.nacked = false;
        process_addr_match(&mut target, isr.contains(Isr::DIR))?;
    }

    if isr.contains(Isr::TXIS) {
        process_tx_byte(&mut target)?;
    }

    if isr.contains(Isr::RXNE) {
        process_rx_byte(&mut target)?;
    }

    if isr.contains(Isr::NACKF) {
        let port = target.port();
        port.clear(Isr::NACKF);
        port.nacked = true;
        process_tx_end(&mut target)?;
    }

    if isr.contains(Isr::STOPF) {
        let port = target.port();
        port.clear(Isr::STOPF);
        if !mem::take(&mut port.nacked) {
            process_rx_end(&mut target)?;
        }
    }

    Ok(())
}

/// Configures bus `id` as a target.
///
/// Pins in `config` are ignored: they are fixed by the board.
pub fn new<'a, R: I2cV2, A: ValidAddress>(
    board: &Board,
    id: impl Into<BusId<'a>>,
    regs: R,
    config: &Config<'_, A>,
) -> Result<Stm32Port<R>, Error> {
    let index = board.resolve(id.into())?;
    config.validate()?;
    Ok(Stm32Port::configure(
        index,
        regs,
        config.raw_addr(),
        A::TEN_BIT,
    ))
}

/// Configures bus `id` and installs it in `registry`, returning its index.
pub fn init<'a, 'm, R: I2cV2, A: ValidAddress, const N: usize>(
    registry: &mut TargetRegistry<'m, Stm32Port<R>, N>,
    board: &Board,
    id: impl Into<BusId<'a>>,
    regs: R,
    config: Config<'m, A>,
) -> Result<usize, Error> {
    let index = board.resolve(id.into())?;
    registry.check_id(index)?;
    config.validate()?;
    let port = Stm32Port::configure(index, regs, config.raw_addr(), A::TEN_BIT);
    registry.attach(index, port, config)?;
    Ok(index)
}
