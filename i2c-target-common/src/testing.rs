//! Software stand-ins for a controller and a bus master

use std::{collections::VecDeque, vec::Vec};

use crate::{HandlerError, TargetData, TargetPort, TargetRegistry, Trigger};

/// Port with one byte deep hardware queues, like most target controllers.
#[derive(Debug, Default)]
pub struct LoopPort {
    rx: VecDeque<u8>,
    tx: VecDeque<u8>,
    tx_count: usize,
    pub irq_configs: Vec<Trigger>,
    pub deinits: usize,
}

impl LoopPort {
    /// Bytes the bus master clocks in.
    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    pub fn pop_tx(&mut self) -> Option<u8> {
        self.tx.pop_front()
    }

    /// Total bytes ever accepted for transmission.
    pub fn tx_written(&self) -> usize {
        self.tx_count
    }
}

impl TargetPort for LoopPort {
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        for slot in buf.iter_mut() {
            match self.rx.pop_front() {
                Some(b) => *slot = b,
                None => break,
            }
            n += 1;
        }
        n
    }

    fn write_bytes(&mut self, buf: &[u8]) -> usize {
        match buf.first() {
            Some(&b) => {
                self.tx.push_back(b);
                self.tx_count += 1;
                1
            }
            None => 0,
        }
    }

    fn irq_config(&mut self, trigger: Trigger) {
        self.irq_configs.push(trigger);
    }

    fn deinit(&mut self) {
        self.deinits += 1;
    }
}

/// Drives one instance the way an interrupt handler reports a bus master.
pub struct Bus<'r, 'm, const N: usize> {
    reg: &'r mut TargetRegistry<'m, LoopPort, N>,
    id: usize,
}

impl<'r, 'm, const N: usize> Bus<'r, 'm, N> {
    pub fn new(reg: &'r mut TargetRegistry<'m, LoopPort, N>, id: usize) -> Self {
        Self { reg, id }
    }

    /// Start (or repeated start) followed by `bytes` written to the target.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), HandlerError> {
        let mut d = self.reg.dispatcher(self.id).expect("attached");
        d.addr_match(false)?;
        for &b in bytes {
            d.port().push_rx(&[b]);
            d.write_request()?;
        }
        Ok(())
    }

    /// Start (or repeated start) followed by `n` bytes read from the target.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>, HandlerError> {
        let mut d = self.reg.dispatcher(self.id).expect("attached");
        d.addr_match(true)?;
        let mut out = Vec::new();
        for _ in 0..n {
            d.read_request()?;
            out.extend(d.port().pop_tx());
        }
        Ok(out)
    }

    pub fn stop(&mut self) -> Result<(), HandlerError> {
        self.reg.dispatcher(self.id).expect("attached").stop()
    }

    pub fn restart_or_stop(&mut self) -> Result<(), HandlerError> {
        self.reg
            .dispatcher(self.id)
            .expect("attached")
            .restart_or_stop()
    }

    pub fn data(&self) -> &TargetData<'m> {
        self.reg.data(self.id).expect("valid id")
    }

    pub fn port(&self) -> &LoopPort {
        self.reg.port(self.id).expect("attached")
    }
}
