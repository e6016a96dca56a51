//! Memory mapped register blocks
//!
//! For controllers without a PAC (Alif, STM32 parts wired up by board code). The
//! RP2 blocks go through their PAC, see [`rp2`](crate::rp2).

use vcell::VolatileCell;

/// A memory mapped peripheral register block and its interrupt line
///
/// Register layouts are applied by the bindings; this type only knows byte
/// offsets.
pub struct Mmio {
    base: *mut u32,
    irq: fn(bool),
}

// SAFETY: `Mmio::new` hands out exclusive access to the block, so moving it to
// another context moves that exclusive access with it.
unsafe impl Send for Mmio {}

impl Mmio {
    /// Wraps the register block at `base`.
    ///
    /// `irq` enables (`true`) or disables (`false`) the interrupt line of the
    /// block.
    ///
    /// # Safety
    ///
    /// `base` must point to the register block of a peripheral that nothing else
    /// accesses for the lifetime of the returned value.
    pub const unsafe fn new(base: *mut u32, irq: fn(bool)) -> Self {
        Self { base, irq }
    }

    fn cell(&self, offset: usize) -> &VolatileCell<u32> {
        // SAFETY: guaranteed by the contract of `new`, offsets come from the
        // register maps of the bindings.
        unsafe { &*self.base.cast::<u8>().add(offset).cast::<VolatileCell<u32>>() }
    }

    /// Reads the 32 bit register at byte `offset`.
    pub fn read(&self, offset: usize) -> u32 {
        self.cell(offset).get()
    }

    /// Writes the 32 bit register at byte `offset`.
    pub fn write(&self, offset: usize, val: u32) {
        self.cell(offset).set(val)
    }

    /// Enables or disables the interrupt line.
    pub fn set_irq_enabled(&self, enabled: bool) {
        (self.irq)(enabled)
    }
}
