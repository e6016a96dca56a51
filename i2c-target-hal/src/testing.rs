//! Simulated controllers for the binding tests

use std::{collections::VecDeque, vec::Vec};

use i2c_target_common::TargetRegistry;

use crate::designware::{self, DesignWarePort, DwApb, Intr, Reg, STATUS_RFNE, STATUS_TFNF};

/// DesignWare block with FIFOs and latched interrupt bits.
#[derive(Debug, Default)]
pub struct DwBlock {
    regs: [u32; 0x80 / 4],
    pub raw: Intr,
    pub rx: VecDeque<u8>,
    pub tx: VecDeque<u8>,
    pub irq_enabled: bool,
}

impl DwBlock {
    /// Last value written to a plain register.
    pub fn reg(&self, reg: Reg) -> u32 {
        self.regs[reg as usize / 4]
    }

    fn raw_stat(&self) -> Intr {
        if self.rx.is_empty() {
            self.raw
        } else {
            self.raw | Intr::RX_FULL
        }
    }

    /// Whether the interrupt line is asserted.
    pub fn pending(&self) -> bool {
        self.irq_enabled
            && self.reg(Reg::Enable) == 1
            && self.raw_stat().bits() & self.reg(Reg::IntrMask) != 0
    }
}

impl DwApb for DwBlock {
    fn read(&mut self, reg: Reg) -> u32 {
        let clear = match reg {
            Reg::DataCmd => return self.rx.pop_front().map_or(0, u32::from),
            Reg::IntrStat => return self.raw_stat().bits() & self.reg(Reg::IntrMask),
            Reg::RawIntrStat => return self.raw_stat().bits(),
            Reg::Status => {
                let rfne = if self.rx.is_empty() { 0 } else { STATUS_RFNE };
                return rfne | STATUS_TFNF;
            }
            Reg::ClrIntr => Intr::all(),
            Reg::ClrRdReq => Intr::RD_REQ,
            Reg::ClrTxAbrt => Intr::TX_ABRT,
            Reg::ClrRxDone => Intr::RX_DONE,
            Reg::ClrStopDet => Intr::STOP_DET,
            _ => return self.reg(reg),
        };
        self.raw.remove(clear);
        0
    }

    fn write(&mut self, reg: Reg, val: u32) {
        match reg {
            Reg::DataCmd => self.tx.push_back(val as u8),
            _ => self.regs[reg as usize / 4] = val,
        }
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        self.irq_enabled = enabled;
    }
}

/// Bus master talking to a simulated DesignWare target.
pub struct DwBus<'r, const N: usize> {
    reg: &'r mut TargetRegistry<'static, DesignWarePort<DwBlock>, N>,
    id: usize,
}

impl<'r, const N: usize> DwBus<'r, N> {
    pub fn new(
        reg: &'r mut TargetRegistry<'static, DesignWarePort<DwBlock>, N>,
        id: usize,
    ) -> Self {
        Self { reg, id }
    }

    fn block(&mut self) -> &mut DwBlock {
        self.reg.port_mut(self.id).expect("attached").regs()
    }

    /// Runs the interrupt handler until the line is released.
    pub fn service(&mut self) {
        for _ in 0..64 {
            if !self.block().pending() {
                return;
            }
            designware::on_interrupt(self.reg, self.id).expect("handler failed");
        }
        panic!("interrupt storm");
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.block().rx.push_back(b);
            self.service();
        }
    }

    /// Reads `n` bytes, then NACKs the last one like a real controller.
    pub fn read(&mut self, n: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for _ in 0..n {
            self.block().raw |= Intr::RD_REQ;
            self.service();
            out.extend(self.block().tx.pop_front());
        }
        self.block().raw |= Intr::RX_DONE;
        self.service();
        let block = self.block();
        if !block.tx.is_empty() {
            block.tx.clear();
            block.raw |= Intr::TX_ABRT;
        }
        self.service();
        out
    }

    pub fn stop(&mut self) {
        self.block().raw |= Intr::STOP_DET;
        self.service();
    }

    pub fn mem(&self) -> &[u8] {
        self.reg
            .data(self.id)
            .and_then(|d| d.mem())
            .expect("memory bound")
    }
}
