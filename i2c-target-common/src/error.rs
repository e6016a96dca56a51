//! Error types

use core::fmt;

/// Configuration error
///
/// These are raised synchronously by the configuration entry points and leave the
/// target untouched, so the caller can retry with corrected arguments.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// There is no controller instance with this id.
    InvalidId(usize),
    /// The controller instance exists but has not been configured as a target.
    NotInitialised(usize),
    /// No bus is known under the requested name.
    UnknownBus,
    /// The memory address size is not one of 8, 16, 24 or 32 bits.
    InvalidMemAddrSize(u32),
    /// The own address does not fit the selected address mode.
    AddressOutOfRange(u16),
    /// Only hard (interrupt context) handlers are supported.
    HardIrqRequired,
    /// The pin cannot serve as SCL for this controller instance.
    BadSclPin(u8),
    /// The pin cannot serve as SDA for this controller instance.
    BadSdaPin(u8),
    /// The operating system refused the request with this errno.
    Os(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidId(id) => write!(f, "I2CTarget({}) doesn't exist", id),
            Error::NotInitialised(id) => write!(f, "I2CTarget({}) not initialised", id),
            Error::UnknownBus => write!(f, "I2C bus doesn't exist"),
            Error::InvalidMemAddrSize(_) => write!(f, "mem_addrsize must be 8, 16, 24 or 32"),
            Error::AddressOutOfRange(addr) => write!(f, "address {:#x} out of range", addr),
            Error::HardIrqRequired => write!(f, "hard IRQ required"),
            Error::BadSclPin(_) => write!(f, "bad SCL pin"),
            Error::BadSdaPin(_) => write!(f, "bad SDA pin"),
            Error::Os(errno) => write!(f, "OS error {}", errno),
        }
    }
}

/// Fault raised by a user IRQ handler
///
/// It is never caught by the protocol core: every dispatch entry point returns it
/// unchanged so it reaches whoever runs the interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandlerError {
    code: u32,
}

impl HandlerError {
    /// Creates an error carrying an application defined code.
    pub const fn new(code: u32) -> Self {
        Self { code }
    }

    /// The application defined code.
    pub const fn code(&self) -> u32 {
        self.code
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I2C target handler failed with code {}", self.code)
    }
}
