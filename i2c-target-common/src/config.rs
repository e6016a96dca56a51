//! Target configuration
//!
//! ```
//! use i2c_target_common::Config;
//!
//! let mut mem = [0u8; 16];
//! let config = Config::new(0x43u8).with_mem(&mut mem).with_mem_addrsize(8);
//! assert!(config.validate().is_ok());
//! ```

use embedded_hal::i2c::{AddressMode, SevenBitAddress, TenBitAddress};

use crate::Error;

/// Marks valid/supported own address types
pub trait ValidAddress: AddressMode + Into<u16> + Copy {
    /// Whether the controller must be put in 10 bit addressing mode.
    const TEN_BIT: bool;

    /// Validates the address against the range of its addressing mode.
    fn is_valid(self) -> Result<(), Error>;
}

impl ValidAddress for SevenBitAddress {
    const TEN_BIT: bool = false;

    fn is_valid(self) -> Result<(), Error> {
        if self >= 0x80 {
            Err(Error::AddressOutOfRange(self.into()))
        } else {
            Ok(())
        }
    }
}

impl ValidAddress for TenBitAddress {
    const TEN_BIT: bool = true;

    fn is_valid(self) -> Result<(), Error> {
        if self >= 0x400 {
            Err(Error::AddressOutOfRange(self))
        } else {
            Ok(())
        }
    }
}

/// Width of the memory offset a controller sends before memory data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemAddrSize(u8);

impl MemAddrSize {
    /// Single byte offset.
    pub const BITS8: Self = Self(1);

    /// Accepts 8, 16, 24 or 32 bits.
    pub const fn from_bits(bits: u32) -> Result<Self, Error> {
        match bits {
            8 | 16 | 24 | 32 => Ok(Self((bits / 8) as u8)),
            _ => Err(Error::InvalidMemAddrSize(bits)),
        }
    }

    /// Number of offset bytes on the wire.
    pub const fn bytes(self) -> u8 {
        self.0
    }

    /// Size in bits.
    pub const fn bits(self) -> u32 {
        self.0 as u32 * 8
    }
}

impl Default for MemAddrSize {
    fn default() -> Self {
        Self::BITS8
    }
}

/// Arguments of a target construction
///
/// The memory buffer is borrowed for `'m`; the target never copies or frees it.
#[derive(Debug)]
pub struct Config<'m, A = SevenBitAddress> {
    /// Own address on the bus.
    pub addr: A,
    /// Optional memory to expose as an addressable EEPROM.
    pub mem: Option<&'m mut [u8]>,
    /// Width of the memory offset in bits.
    pub mem_addrsize: u32,
    /// SCL pin, `None` for the board default.
    pub scl: Option<u8>,
    /// SDA pin, `None` for the board default.
    pub sda: Option<u8>,
}

impl<'m, A: ValidAddress> Config<'m, A> {
    /// Callback driven target at `addr` on the default pins.
    pub fn new(addr: A) -> Self {
        Self {
            addr,
            mem: None,
            mem_addrsize: 8,
            scl: None,
            sda: None,
        }
    }

    /// Binds a memory buffer.
    pub fn with_mem(mut self, mem: &'m mut [u8]) -> Self {
        self.mem = Some(mem);
        self
    }

    /// Sets the memory offset width in bits.
    pub fn with_mem_addrsize(mut self, bits: u32) -> Self {
        self.mem_addrsize = bits;
        self
    }

    /// Selects the SCL and SDA pins.
    pub fn with_pins(mut self, scl: u8, sda: u8) -> Self {
        self.scl = Some(scl);
        self.sda = Some(sda);
        self
    }

    /// Checks everything that does not depend on the port.
    ///
    /// Ports call this before touching any register.
    pub fn validate(&self) -> Result<MemAddrSize, Error> {
        self.addr.is_valid()?;
        MemAddrSize::from_bits(self.mem_addrsize)
    }

    /// The own address as written to the address register.
    pub fn raw_addr(&self) -> u16 {
        self.addr.into()
    }
}
