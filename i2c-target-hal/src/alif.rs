//! # Alif Ensemble I2C target
//!
//! The Ensemble parts have four DesignWare I2C blocks. Only the blocks the board
//! routes to pins exist as targets. The handler decodes the raw interrupt status
//! and the block runs with `TX_EMPTY_CTRL` set.
//!
//! Pins are used as given: muxing them to the I2C function is board glue.

use i2c_target_common::{Config, Error, TargetRegistry, ValidAddress};

use crate::designware::{DesignWarePort, DwApb, Reg, Variant, CON_TX_EMPTY_CTRL};

/// Number of I2C controllers.
pub const NUM_INSTANCES: usize = 4;

/// The Alif integration decodes the raw interrupt status.
pub const VARIANT: Variant = Variant {
    stat: Reg::RawIntrStat,
    con: CON_TX_EMPTY_CTRL,
};

/// Board wiring of the I2C controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    /// `(scl, sda)` of each controller, `None` if the board does not route it.
    pub pins: [Option<(u8, u8)>; NUM_INSTANCES],
}

impl Board {
    /// Default pins of controller `id`.
    pub fn pins(&self, id: usize) -> Result<(u8, u8), Error> {
        self.pins
            .get(id)
            .copied()
            .flatten()
            .ok_or(Error::InvalidId(id))
    }
}

/// Configures controller `id` as a target.
pub fn new<R: DwApb, A: ValidAddress>(
    board: &Board,
    id: usize,
    regs: R,
    config: &Config<'_, A>,
) -> Result<DesignWarePort<R>, Error> {
    let (scl, sda) = board.pins(id)?;
    config.validate()?;
    Ok(DesignWarePort::configure(
        id,
        regs,
        VARIANT,
        config.raw_addr(),
        A::TEN_BIT,
        config.scl.unwrap_or(scl),
        config.sda.unwrap_or(sda),
    ))
}

/// Configures controller `id` and installs it in `registry`.
pub fn init<'m, R: DwApb, A: ValidAddress, const N: usize>(
    registry: &mut TargetRegistry<'m, DesignWarePort<R>, N>,
    board: &Board,
    id: usize,
    regs: R,
    config: Config<'m, A>,
) -> Result<(), Error> {
    registry.check_id(id)?;
    let port = new(board, id, regs, &config)?;
    registry.attach(id, port, config)?;
    Ok(())
}
