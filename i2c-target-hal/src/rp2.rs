//! # RP2040 / RP235x I2C target
//!
//! Both chips carry two DesignWare I2C blocks. SDA and SCL live on even and odd
//! GPIOs respectively, and I2C0 and I2C1 alternate on successive pairs of pins.
//!
//! Pin function selection is left to the application (for instance through the
//! `gpio` module of the chip's HAL); this module only checks that the pins can
//! reach the selected controller.
//!
//! With the `rp2040` or `rp235x` feature, `rp2040::i2c0(..)` and friends take the
//! PAC singleton out of reset and return a [`DwApb`] implementation over its typed
//! register accessors.

use i2c_target_common::{Config, Error, TargetRegistry, ValidAddress};

use crate::designware::{DesignWarePort, DwApb, Reg, Variant};

/// Number of I2C controllers.
pub const NUM_INSTANCES: usize = 2;

/// `(scl, sda)` used when the configuration does not name pins.
pub const DEFAULT_PINS: [(u8, u8); NUM_INSTANCES] = [(5, 4), (7, 6)];

/// The RP2 integration decodes the masked interrupt status.
pub const VARIANT: Variant = Variant {
    stat: Reg::IntrStat,
    con: 0,
};

/// Whether `pin` can be the SCL line of controller `id`.
pub const fn is_valid_scl(id: usize, pin: u8) -> bool {
    pin & 1 == 1 && ((pin & 2) >> 1) as usize == id
}

/// Whether `pin` can be the SDA line of controller `id`.
pub const fn is_valid_sda(id: usize, pin: u8) -> bool {
    pin & 1 == 0 && ((pin & 2) >> 1) as usize == id
}

/// Configures controller `id` as a target.
///
/// Everything is validated before the first register access.
pub fn new<R: DwApb, A: ValidAddress>(
    id: usize,
    regs: R,
    config: &Config<'_, A>,
) -> Result<DesignWarePort<R>, Error> {
    let (default_scl, default_sda) = *DEFAULT_PINS.get(id).ok_or(Error::InvalidId(id))?;
    config.validate()?;

    let scl = match config.scl {
        Some(pin) if !is_valid_scl(id, pin) => return Err(Error::BadSclPin(pin)),
        Some(pin) => pin,
        None => default_scl,
    };
    let sda = match config.sda {
        Some(pin) if !is_valid_sda(id, pin) => return Err(Error::BadSdaPin(pin)),
        Some(pin) => pin,
        None => default_sda,
    };

    Ok(DesignWarePort::configure(
        id,
        regs,
        VARIANT,
        config.raw_addr(),
        A::TEN_BIT,
        scl,
        sda,
    ))
}

/// Configures controller `id` and installs it in `registry`.
pub fn init<'m, R: DwApb, A: ValidAddress, const N: usize>(
    registry: &mut TargetRegistry<'m, DesignWarePort<R>, N>,
    id: usize,
    regs: R,
    config: Config<'m, A>,
) -> Result<(), Error> {
    registry.check_id(id)?;
    let port = new(id, regs, &config)?;
    registry.attach(id, port, config)?;
    Ok(())
}

#[cfg(any(feature = "rp2040", feature = "rp235x"))]
macro_rules! registers {
    ($pac:ident) => {
        use core::ops::Deref;

        use crate::designware::{DwApb, Reg};

        /// A PAC I2C block owned by the target driver, with its interrupt line
        pub struct Block<I> {
            i2c: I,
            irq: fn(bool),
        }

        impl<I> Block<I> {
            /// Gives the PAC singleton back, leaving the hardware as it is.
            pub fn free(self) -> I {
                self.i2c
            }
        }

        impl<I: Deref<Target = $pac::i2c0::RegisterBlock>> DwApb for Block<I> {
            fn read(&mut self, reg: Reg) -> u32 {
                let i2c = &*self.i2c;
                match reg {
                    Reg::Con => i2c.ic_con().read().bits(),
                    Reg::Sar => i2c.ic_sar().read().bits(),
                    Reg::DataCmd => i2c.ic_data_cmd().read().dat().bits().into(),
                    Reg::IntrStat => i2c.ic_intr_stat().read().bits(),
                    Reg::IntrMask => i2c.ic_intr_mask().read().bits(),
                    Reg::RawIntrStat => i2c.ic_raw_intr_stat().read().bits(),
                    Reg::RxTl => i2c.ic_rx_tl().read().bits(),
                    Reg::TxTl => i2c.ic_tx_tl().read().bits(),
                    Reg::ClrIntr => i2c.ic_clr_intr().read().bits(),
                    Reg::ClrRdReq => i2c.ic_clr_rd_req().read().bits(),
                    Reg::ClrTxAbrt => i2c.ic_clr_tx_abrt().read().bits(),
                    Reg::ClrRxDone => i2c.ic_clr_rx_done().read().bits(),
                    Reg::ClrStopDet => i2c.ic_clr_stop_det().read().bits(),
                    Reg::Enable => i2c.ic_enable().read().bits(),
                    Reg::Status => i2c.ic_status().read().bits(),
                }
            }

            fn write(&mut self, reg: Reg, val: u32) {
                let i2c = &*self.i2c;
                // SAFETY: we own the block. Values come from the DesignWare target
                // core and are truncated to the width of their field.
                match reg {
                    Reg::Con => {
                        i2c.ic_con().write(|w| unsafe { w.bits(val) });
                    }
                    Reg::Sar => {
                        i2c.ic_sar().write(|w| unsafe { w.ic_sar().bits(val as u16) });
                    }
                    Reg::DataCmd => {
                        i2c.ic_data_cmd().write(|w| unsafe { w.dat().bits(val as u8) });
                    }
                    Reg::IntrMask => {
                        i2c.ic_intr_mask().write(|w| unsafe { w.bits(val) });
                    }
                    Reg::RxTl => {
                        i2c.ic_rx_tl().write(|w| unsafe { w.rx_tl().bits(val as u8) });
                    }
                    Reg::TxTl => {
                        i2c.ic_tx_tl().write(|w| unsafe { w.tx_tl().bits(val as u8) });
                    }
                    Reg::Enable => {
                        i2c.ic_enable().write(|w| w.enable().bit(val & 1 != 0));
                    }
                    // Status and clear-on-read registers.
                    Reg::IntrStat
                    | Reg::RawIntrStat
                    | Reg::ClrIntr
                    | Reg::ClrRdReq
                    | Reg::ClrTxAbrt
                    | Reg::ClrRxDone
                    | Reg::ClrStopDet
                    | Reg::Status => {}
                }
            }

            fn set_irq_enabled(&mut self, enabled: bool) {
                (self.irq)(enabled)
            }
        }
    };
}

#[cfg(any(feature = "rp2040", feature = "rp235x"))]
macro_rules! block {
    ($pac:ident, $I2C:ident, $i2c:ident) => {
        paste::paste! {
            fn [<$i2c _irq>](enabled: bool) {
                use cortex_m::peripheral::NVIC;

                if enabled {
                    // SAFETY: the register block is owned by the target driver, which
                    // provides the interrupt handler.
                    unsafe { NVIC::unmask($pac::Interrupt::[<$I2C _IRQ>]) }
                } else {
                    NVIC::mask($pac::Interrupt::[<$I2C _IRQ>])
                }
            }

            #[doc = concat!("Takes ", stringify!($I2C), " out of reset for the target driver.")]
            pub fn $i2c(i2c: $pac::$I2C, resets: &mut $pac::RESETS) -> Block<$pac::$I2C> {
                resets.reset().modify(|_, w| w.$i2c().set_bit());
                resets.reset().modify(|_, w| w.$i2c().clear_bit());
                while resets.reset_done().read().$i2c().bit_is_clear() {}

                Block {
                    i2c,
                    irq: [<$i2c _irq>],
                }
            }
        }
    };
}

/// PAC register blocks of the RP2040 I2C controllers
#[cfg(feature = "rp2040")]
pub mod rp2040 {
    registers!(rp2040_pac);
    block!(rp2040_pac, I2C0, i2c0);
    block!(rp2040_pac, I2C1, i2c1);
}

/// PAC register blocks of the RP235x I2C controllers
#[cfg(feature = "rp235x")]
pub mod rp235x {
    registers!(rp235x_pac);
    block!(rp235x_pac, I2C0, i2c0);
    block!(rp235x_pac, I2C1, i2c1);
}

#[cfg(test)]
mod test {
    use embedded_hal::i2c::TenBitAddress;

    use super::*;
    use crate::{
        designware::{CON_10BITADDR_SLAVE, CON_STOP_DET_IFADDRESSED},
        testing::DwBlock,
    };

    #[test]
    fn pin_rules() {
        assert!(is_valid_scl(0, 1) && is_valid_sda(0, 0));
        assert!(is_valid_scl(0, 5) && is_valid_sda(0, 4));
        assert!(is_valid_scl(1, 3) && is_valid_sda(1, 2));
        assert!(is_valid_scl(1, 7) && is_valid_sda(1, 6));
        assert!(!is_valid_scl(0, 4));
        assert!(!is_valid_scl(0, 3));
        assert!(!is_valid_sda(1, 4));
        assert!(!is_valid_sda(1, 7));
        for (id, &(scl, sda)) in DEFAULT_PINS.iter().enumerate() {
            assert!(is_valid_scl(id, scl));
            assert!(is_valid_sda(id, sda));
        }
    }

    #[test]
    fn default_pins_and_display() {
        let mut block = DwBlock::default();
        let port = new(1, &mut block, &Config::new(0x41u8)).unwrap();
        assert_eq!(port.pins(), (7, 6));
        assert_eq!(
            std::format!("{}", port),
            "I2CTarget(1, addr=65, scl=7, sda=6)"
        );
    }

    #[test]
    fn explicit_pins() {
        let mut block = DwBlock::default();
        let port = new(0, &mut block, &Config::new(0x41u8).with_pins(9, 8)).unwrap();
        assert_eq!(port.pins(), (9, 8));
    }

    #[test]
    fn errors_leave_the_block_alone() {
        let mut block = DwBlock::default();
        let cases = [
            (2, Config::new(0x41u8), Error::InvalidId(2)),
            (0, Config::new(0x41u8).with_pins(4, 4), Error::BadSclPin(4)),
            (1, Config::new(0x41u8).with_pins(7, 5), Error::BadSdaPin(5)),
            (
                0,
                Config::new(0x41u8).with_mem_addrsize(7),
                Error::InvalidMemAddrSize(7),
            ),
            (0, Config::new(0x80u8), Error::AddressOutOfRange(0x80)),
        ];
        for (id, config, err) in cases {
            assert_eq!(new(id, &mut block, &config).err(), Some(err));
        }
        assert_eq!(block.reg(Reg::Con), 0);
        assert!(!block.irq_enabled);
    }

    #[test]
    fn ten_bit_address() {
        let mut block = DwBlock::default();
        new(0, &mut block, &Config::new(0x3c5 as TenBitAddress)).unwrap();
        assert_eq!(
            block.reg(Reg::Con),
            CON_STOP_DET_IFADDRESSED | CON_10BITADDR_SLAVE
        );
        assert_eq!(block.reg(Reg::Sar), 0x3c5);
    }

    #[test]
    fn init_installs_the_port() {
        let mut reg: TargetRegistry<'_, DesignWarePort<DwBlock>, NUM_INSTANCES> =
            TargetRegistry::new();
        init(&mut reg, 1, DwBlock::default(), Config::new(0x42u8)).unwrap();
        assert_eq!(reg.port(1).map(DesignWarePort::addr), Some(0x42));
        assert!(reg.port(0).is_none());
    }
}
