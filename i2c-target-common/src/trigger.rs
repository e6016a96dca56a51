//! Event bits
//!
//! The same bit layout serves as the subscription mask of an [`Irq`](crate::Irq)
//! (its trigger) and as the record of what actually fired (its flags).

bitflags::bitflags! {
    /// Events an IRQ handler can subscribe to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Trigger: u32 {
        /// The controller addressed this target.
        const ADDR_MATCH = 1 << 0;
        /// The controller wants the next byte.
        const READ_REQ = 1 << 1;
        /// The controller sent a byte.
        const WRITE_REQ = 1 << 2;
        /// The transfer ended, by a repeated start or a stop condition.
        const END = 1 << 3;
        /// The transfer ended with a stop condition on the bus.
        const STOP = 1 << 4;
    }
}

impl Trigger {
    /// The memory offset has been selected by the leading address byte(s).
    pub(crate) const MEM_ADDR_MATCH: Self = Self::from_bits_retain(1 << 5);
    /// First byte of a memory read.
    pub(crate) const READ_START: Self = Self::from_bits_retain(1 << 6);
    /// First data byte of a memory write.
    pub(crate) const WRITE_START: Self = Self::from_bits_retain(1 << 7);
    /// A memory read was closed.
    pub(crate) const READ_END: Self = Self::from_bits_retain(1 << 8);
    /// A memory write was closed.
    pub(crate) const WRITE_END: Self = Self::from_bits_retain(1 << 9);
}

#[cfg(feature = "defmt")]
impl defmt::Format for Trigger {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Trigger({=u32:#x})", self.bits())
    }
}
