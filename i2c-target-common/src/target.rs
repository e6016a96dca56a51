//! Per-instance protocol state and memory emulation
//!
//! [`TargetData`] only models the bytes; events and the hardware are driven by
//! [`Dispatcher`](crate::Dispatcher).

use crate::MemAddrSize;

/// Logical protocol phase of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No transfer in progress, or waiting for the memory offset.
    Idle,
    /// The memory offset has been received.
    MemAddrSelected,
    /// Memory bytes are being sent to the controller.
    Reading,
    /// Memory bytes are being received from the controller.
    Writing,
}

/// What a received byte did to the memory emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Received {
    /// Part of the memory offset, more offset bytes expected.
    AddrPartial,
    /// Last byte of the memory offset.
    AddrSelected,
    /// First data byte of a write.
    FirstData,
    /// Any further data byte.
    Data,
}

/// Protocol state of one controller instance
///
/// When a memory buffer is bound, `mem_addr < mem.len()` always holds. A bound
/// buffer is never empty: an empty buffer is treated as no buffer at all.
#[derive(Debug)]
pub struct TargetData<'m> {
    state: State,
    mem_addr: u32,
    mem: Option<&'m mut [u8]>,
    mem_addrsize: MemAddrSize,
    // Offset bytes received so far and their big endian accumulation.
    addr_pending: u8,
    addr_acc: u32,
}

impl<'m> TargetData<'m> {
    /// Idle target without memory.
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            mem_addr: 0,
            mem: None,
            mem_addrsize: MemAddrSize::BITS8,
            addr_pending: 0,
            addr_acc: 0,
        }
    }

    /// Re-initialises the data for a new configuration.
    pub fn init(&mut self, mem: Option<&'m mut [u8]>, mem_addrsize: MemAddrSize) {
        *self = Self {
            mem: mem.filter(|m| !m.is_empty()),
            mem_addrsize,
            ..Self::new()
        };
    }

    /// Current protocol phase.
    pub fn state(&self) -> State {
        self.state
    }

    /// Current offset into the memory buffer.
    pub fn mem_addr(&self) -> u32 {
        self.mem_addr
    }

    /// Length of the memory buffer, 0 without one.
    pub fn mem_len(&self) -> usize {
        self.mem.as_deref().map_or(0, <[u8]>::len)
    }

    /// The bound memory buffer.
    pub fn mem(&self) -> Option<&[u8]> {
        self.mem.as_deref()
    }

    /// Whether a memory buffer is bound.
    pub fn has_mem(&self) -> bool {
        self.mem.is_some()
    }

    /// Width of the memory offset.
    pub fn mem_addrsize(&self) -> MemAddrSize {
        self.mem_addrsize
    }

    /// Drops the memory buffer and returns to `Idle`.
    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    /// Ends the current transfer, returning the state it was in.
    ///
    /// A partially received memory offset is discarded.
    pub(crate) fn close(&mut self) -> State {
        let previous = self.state;
        self.state = State::Idle;
        self.addr_pending = 0;
        self.addr_acc = 0;
        previous
    }

    /// Enters `Reading`, returning `true` if this starts a memory read.
    pub(crate) fn begin_read(&mut self) -> bool {
        if self.state == State::Reading {
            false
        } else {
            self.state = State::Reading;
            true
        }
    }

    /// Fetches the byte at the current offset and advances the offset.
    ///
    /// Returns `None` without a memory buffer.
    pub(crate) fn read_byte(&mut self) -> Option<u8> {
        let mem = self.mem.as_deref()?;
        let val = mem[self.mem_addr as usize];
        self.mem_addr = advance(self.mem_addr, mem.len());
        Some(val)
    }

    /// Feeds a byte received from the controller into the memory emulation.
    ///
    /// Returns `None` without a memory buffer.
    pub(crate) fn receive_byte(&mut self, val: u8) -> Option<Received> {
        let mem = self.mem.as_deref_mut()?;
        match self.state {
            State::Idle => {
                self.addr_acc = self.addr_acc << 8 | u32::from(val);
                self.addr_pending += 1;
                if self.addr_pending < self.mem_addrsize.bytes() {
                    return Some(Received::AddrPartial);
                }
                self.mem_addr = (u64::from(self.addr_acc) % mem.len() as u64) as u32;
                self.addr_pending = 0;
                self.addr_acc = 0;
                self.state = State::MemAddrSelected;
                Some(Received::AddrSelected)
            }
            state => {
                mem[self.mem_addr as usize] = val;
                self.mem_addr = advance(self.mem_addr, mem.len());
                if state == State::MemAddrSelected {
                    self.state = State::Writing;
                    Some(Received::FirstData)
                } else {
                    Some(Received::Data)
                }
            }
        }
    }
}

impl Default for TargetData<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn advance(addr: u32, len: usize) -> u32 {
    let next = addr + 1;
    if next as usize >= len {
        0
    } else {
        next
    }
}
