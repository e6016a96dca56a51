//! # DesignWare APB I2C target core
//!
//! The Synopsys DesignWare I2C block is used by both the Alif and the RP2 families.
//! Its interrupt handler reports the following raw conditions for a target:
//!
//! - scan (0-byte write) of us: `STOP_DET`
//! - write of n bytes: `RX_FULL` * n, `STOP_DET`
//! - write of n bytes then read of m bytes: `RX_FULL` * n, `RD_REQ` * m, `RX_DONE`,
//!   `STOP_DET`
//!
//! Start conditions are not reported, so address matches are derived from the
//! first data condition of each direction, using a mirror of the transfer phase
//! kept by the port.
//!
//! `RX_FULL` and `RD_REQ` are masked while they are being served and re-enabled by
//! [`TargetPort::read_bytes`] and [`TargetPort::write_bytes`]. The block keeps
//! stretching the clock in the meantime.

use core::fmt;

use i2c_target_common::{
    debug, trace, Dispatcher, HandlerError, TargetPort, TargetRegistry, Trigger,
};

use crate::mmio::Mmio;

/// DesignWare APB I2C registers used by the target core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum Reg {
    /// IC_CON
    Con = 0x00,
    /// IC_SAR
    Sar = 0x08,
    /// IC_DATA_CMD
    DataCmd = 0x10,
    /// IC_INTR_STAT
    IntrStat = 0x2c,
    /// IC_INTR_MASK
    IntrMask = 0x30,
    /// IC_RAW_INTR_STAT
    RawIntrStat = 0x34,
    /// IC_RX_TL
    RxTl = 0x38,
    /// IC_TX_TL
    TxTl = 0x3c,
    /// IC_CLR_INTR
    ClrIntr = 0x40,
    /// IC_CLR_RD_REQ
    ClrRdReq = 0x50,
    /// IC_CLR_TX_ABRT
    ClrTxAbrt = 0x54,
    /// IC_CLR_RX_DONE
    ClrRxDone = 0x58,
    /// IC_CLR_STOP_DET
    ClrStopDet = 0x60,
    /// IC_ENABLE
    Enable = 0x6c,
    /// IC_STATUS
    Status = 0x70,
}

bitflags::bitflags! {
    /// Bits shared by IC_INTR_STAT, IC_INTR_MASK and IC_RAW_INTR_STAT
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Intr: u32 {
        /// RX FIFO read while empty.
        const RX_UNDER = 1 << 0;
        /// RX FIFO overflow.
        const RX_OVER = 1 << 1;
        /// RX FIFO above threshold.
        const RX_FULL = 1 << 2;
        /// TX FIFO overflow.
        const TX_OVER = 1 << 3;
        /// TX FIFO at or below threshold.
        const TX_EMPTY = 1 << 4;
        /// A controller wants to read.
        const RD_REQ = 1 << 5;
        /// Transmit aborted, TX FIFO flushed.
        const TX_ABRT = 1 << 6;
        /// The controller did not acknowledge a transmitted byte.
        const RX_DONE = 1 << 7;
        /// Bus activity.
        const ACTIVITY = 1 << 8;
        /// Stop condition.
        const STOP_DET = 1 << 9;
        /// Start or repeated start condition.
        const START_DET = 1 << 10;
        /// General call address received.
        const GEN_CALL = 1 << 11;
        /// Repeated start addressed to us.
        const RESTART_DET = 1 << 12;
    }
}

/// IC_CON: 10 bit target addressing.
pub const CON_10BITADDR_SLAVE: u32 = 1 << 3;
/// IC_CON: only report stop conditions of transfers addressed to us.
pub const CON_STOP_DET_IFADDRESSED: u32 = 1 << 7;
/// IC_CON: TX_EMPTY follows the TX FIFO threshold instead of the shifter.
pub const CON_TX_EMPTY_CTRL: u32 = 1 << 8;

/// IC_STATUS: transmit FIFO not full.
pub const STATUS_TFNF: u32 = 1 << 1;
/// IC_STATUS: receive FIFO not empty.
pub const STATUS_RFNE: u32 = 1 << 3;

/// Interrupt sources serviced by [`on_interrupt`].
pub const TARGET_INTRS: Intr = Intr::STOP_DET
    .union(Intr::RX_DONE)
    .union(Intr::TX_ABRT)
    .union(Intr::RD_REQ)
    .union(Intr::RX_FULL);

/// Access to one DesignWare I2C block
///
/// Reads take `&mut self` because some registers clear state when read.
pub trait DwApb {
    /// Reads a register.
    fn read(&mut self, reg: Reg) -> u32;

    /// Writes a register.
    fn write(&mut self, reg: Reg, val: u32);

    /// Enables or disables the block's interrupt line.
    fn set_irq_enabled(&mut self, enabled: bool);

    /// Read-modify-write of a register.
    fn modify(&mut self, reg: Reg, f: impl FnOnce(u32) -> u32) {
        let val = self.read(reg);
        self.write(reg, f(val));
    }
}

impl<T: DwApb + ?Sized> DwApb for &mut T {
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

impl DwApb for Mmio {
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

/// How an integration of the block behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    /// Status register decoded by the interrupt handler.
    pub stat: Reg,
    /// Extra IC_CON bits.
    pub con: u32,
}

/// Transfer phase as seen from the interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    Idle,
    Reading,
    Writing,
}

/// A DesignWare I2C block configured as a target
pub struct DesignWarePort<R> {
    id: usize,
    regs: R,
    variant: Variant,
    phase: Phase,
    addr: u16,
    scl: u8,
    sda: u8,
}

impl<R: DwApb> DesignWarePort<R> {
    /// Puts the block in target mode at `addr` and unmasks its interrupt line.
    ///
    /// The bus should be idle. `scl` and `sda` are only recorded for display.
    pub fn configure(
        id: usize,
        mut regs: R,
        variant: Variant,
        addr: u16,
        ten_bit: bool,
        scl: u8,
        sda: u8,
    ) -> Self {
        regs.write(Reg::Enable, 0);

        let mut con = CON_STOP_DET_IFADDRESSED | variant.con;
        if ten_bit {
            con |= CON_10BITADDR_SLAVE;
        }
        regs.write(Reg::Con, con);
        regs.write(Reg::Sar, u32::from(addr));
        regs.write(Reg::TxTl, 1);
        // Interrupt as soon as one byte is available.
        regs.write(Reg::RxTl, 0);
        regs.write(Reg::IntrMask, TARGET_INTRS.bits());
        regs.read(Reg::ClrIntr);
        regs.write(Reg::Enable, 1);
        regs.set_irq_enabled(true);

        debug!("i2c target {}: designware block enabled", id);
        Self {
            id,
            regs,
            variant,
            phase: Phase::Idle,
            addr,
            scl,
            sda,
        }
    }

    /// Index of the controller instance.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Own address as configured.
    pub fn addr(&self) -> u16 {
        self.addr
    }

    /// SCL and SDA pins.
    pub fn pins(&self) -> (u8, u8) {
        (self.scl, self.sda)
    }

    /// The register block.
    pub fn regs(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Gives the register block back, leaving the hardware as it is.
    pub fn free(self) -> R {
        self.regs
    }

    fn mask(&mut self, intr: Intr) {
        self.regs.modify(Reg::IntrMask, |m| m & !intr.bits());
    }

    fn unmask(&mut self, intr: Intr) {
        self.regs.modify(Reg::IntrMask, |m| m | intr.bits());
    }

    fn enter(&mut self, phase: Phase) -> Phase {
        core::mem::replace(&mut self.phase, phase)
    }
}

impl<R: DwApb> TargetPort for DesignWarePort<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        for b in buf.iter_mut() {
            if self.regs.read(Reg::Status) & STATUS_RFNE == 0 {
                break;
            }
            *b = self.regs.read(Reg::DataCmd) as u8;
            n += 1;
        }
        self.unmask(Intr::RX_FULL);
        n
    }

    fn write_bytes(&mut self, buf: &[u8]) -> usize {
        let n = match buf.first() {
            Some(&b) => {
                self.regs.write(Reg::DataCmd, u32::from(b));
                1
            }
            None => 0,
        };
        self.unmask(Intr::RD_REQ);
        n
    }

    fn irq_config(&mut self, _trigger: Trigger) {}

    fn deinit(&mut self) {
        self.regs.set_irq_enabled(false);
        self.regs.write(Reg::IntrMask, 0);
        self.regs.write(Reg::Enable, 0);
        self.phase = Phase::Idle;
        debug!("i2c target {}: designware block disabled", self.id);
    }
}

impl<R> fmt::Display for DesignWarePort<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "I2CTarget({}, addr={}, scl={}, sda={})",
            self.id, self.addr, self.scl, self.sda
        )
    }
}

/// Services the interrupt of instance `id`.
///
/// Call this from the block's interrupt handler. Handler errors are returned
/// after the hardware condition that caused them has been acknowledged.
pub fn on_interrupt<R: DwApb, const N: usize>(
    registry: &mut TargetRegistry<'_, DesignWarePort<R>, N>,
    id: usize,
) -> Result<(), HandlerError> {
    let Some(mut target) = registry.dispatcher(id) else {
        return Ok(());
    };
    let port = target.port();
    let stat = Intr::from_bits_retain(port.regs.read(port.variant.stat));
    trace!("i2c target {}: intr {=u32:#x}", id, stat.bits());

    if stat.contains(Intr::TX_ABRT) {
        target.port().regs.read(Reg::ClrTxAbrt);
    }

    if stat.contains(Intr::RX_FULL) {
        // Masked until DATA_CMD has been read.
        serve(&mut target, Intr::RX_FULL, Phase::Writing)?;
    }

    if stat.intersects(Intr::RD_REQ | Intr::RX_DONE) {
        // RX_DONE needs no data but still counts as a read request. The byte
        // written for it is flushed by a TX_ABRT.
        let port = target.port();
        port.regs.read(Reg::ClrRxDone);
        port.regs.read(Reg::ClrRdReq);
        serve(&mut target, Intr::RD_REQ, Phase::Reading)?;
    }

    if stat.contains(Intr::STOP_DET) {
        let port = target.port();
        port.regs.read(Reg::ClrStopDet);
        if port.enter(Phase::Idle) == Phase::Idle {
            // Nothing was transferred: a scan.
            target.addr_match(false)?;
        }
        target.restart_or_stop()?;
    }

    Ok(())
}

/// Serves one data request of `phase` with `intr` masked.
///
/// The byte transfer re-enables `intr`. A failing handler can skip the
/// transfer, in which case `intr` is unmasked here.
fn serve<R: DwApb>(
    target: &mut Dispatcher<'_, '_, DesignWarePort<R>>,
    intr: Intr,
    phase: Phase,
) -> Result<(), HandlerError> {
    let port = target.port();
    port.mask(intr);
    let start = port.enter(phase) != phase;
    let read = phase == Phase::Reading;

    let result = (|| {
        if start {
            target.addr_match(read)?;
        }
        if read {
            target.read_request()
        } else {
            target.write_request()
        }
    })();

    if result.is_err() {
        target.port().unmask(intr);
    }
    result
}
