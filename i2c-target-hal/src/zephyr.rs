//! # Zephyr I2C target
//!
//! Zephyr controller drivers report target transfers through the five
//! `i2c_target_callbacks`. Drivers disagree on how reads are reported: some give
//! one `read_requested` followed by `read_processed` for every further byte
//! (STM32), others repeat `read_requested` before each `read_processed`
//! (DesignWare). Both are folded into one address match per transfer.
//!
//! Zephyr only reports stop conditions, never repeated starts.

use core::fmt;

use i2c_target_common::{
    debug, trace, Config, Error, HandlerError, TargetPort, TargetRegistry, Trigger, ValidAddress,
};

/// Stack kept free below the handler when it runs on the ISR stack.
pub const ISR_STACK_MARGIN: usize = 512;

/// Bounds used by the runtime's stack overflow check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackLimit {
    /// Address the stack grows down from.
    pub top: usize,
    /// Usable size below `top`.
    pub limit: usize,
}

/// A Zephyr I2C controller device
pub trait ZephyrDevice {
    /// `CONFIG_ISR_STACK_SIZE` of the image.
    const ISR_STACK_SIZE: usize;

    /// Device name from the devicetree.
    fn name(&self) -> &str;

    /// `i2c_target_register()`, returning the negative errno on failure.
    fn target_register(&mut self, addr: u16, ten_bit: bool) -> Result<(), i32>;

    /// `i2c_target_unregister()`.
    fn target_unregister(&mut self);

    /// Current stack check bounds.
    fn stack_limit(&self) -> StackLimit;

    /// Replaces the stack check bounds.
    fn set_stack_limit(&mut self, limit: StackLimit);
}

/// A Zephyr controller registered as a target
pub struct ZephyrPort<D> {
    dev: D,
    addr: u16,
    registered: bool,
    reading: bool,
    writing: bool,
    // Byte exchanged with the driver callbacks.
    latch: u8,
}

impl<D: ZephyrDevice> ZephyrPort<D> {
    /// Registers `dev` as a target with the address of `config`.
    pub fn register<A: ValidAddress>(mut dev: D, config: &Config<'_, A>) -> Result<Self, Error> {
        config.validate()?;
        dev.target_register(config.raw_addr(), A::TEN_BIT)
            .map_err(|ret| Error::Os(-ret))?;
        debug!("i2c target: registered");
        Ok(Self {
            dev,
            addr: config.raw_addr(),
            registered: true,
            reading: false,
            writing: false,
            latch: 0,
        })
    }

    /// The controller device.
    pub fn device(&mut self) -> &mut D {
        &mut self.dev
    }

    /// Own address as registered.
    pub fn addr(&self) -> u16 {
        self.addr
    }
}

impl<D: ZephyrDevice> TargetPort for ZephyrPort<D> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        match buf.first_mut() {
            Some(b) => {
                *b = self.latch;
                1
            }
            None => 0,
        }
    }

    fn write_bytes(&mut self, buf: &[u8]) -> usize {
        match buf.first() {
            Some(&b) => {
                self.latch = b;
                1
            }
            None => 0,
        }
    }

    fn irq_config(&mut self, _trigger: Trigger) {}

    fn deinit(&mut self) {
        if core::mem::take(&mut self.registered) {
            self.dev.target_unregister();
            debug!("i2c target: unregistered");
        }
        self.reading = false;
        self.writing = false;
    }

    /// Runs the handler with the stack check moved to the ISR stack.
    fn event_callback<R>(&mut self, handler: impl FnOnce(&mut Self) -> R) -> R {
        let marker = 0u8;
        let saved = self.dev.stack_limit();
        self.dev.set_stack_limit(StackLimit {
            top: core::ptr::addr_of!(marker) as usize,
            limit: D::ISR_STACK_SIZE.saturating_sub(ISR_STACK_MARGIN),
        });
        let result = handler(self);
        self.dev.set_stack_limit(saved);
        result
    }
}

impl<D: ZephyrDevice> fmt::Display for ZephyrPort<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I2CTarget({}, addr={})", self.dev.name(), self.addr)
    }
}

/// Registers `dev` and installs it in slot `id` of `registry`.
///
/// A device already installed in the slot is unregistered first.
pub fn init<'m, D: ZephyrDevice, A: ValidAddress, const N: usize>(
    registry: &mut TargetRegistry<'m, ZephyrPort<D>, N>,
    id: usize,
    dev: D,
    config: Config<'m, A>,
) -> Result<(), Error> {
    registry.check_id(id)?;
    config.validate()?;
    // A controller holds a single target registration.
    if let Some(previous) = registry.port_mut(id) {
        previous.deinit();
    }
    let port = ZephyrPort::register(dev, &config)?;
    registry.attach(id, port, config)?;
    Ok(())
}

/// `write_requested`: the controller starts writing.
pub fn write_requested<D: ZephyrDevice, const N: usize>(
    registry: &mut TargetRegistry<'_, ZephyrPort<D>, N>,
    id: usize,
) -> Result<(), HandlerError> {
    let Some(mut target) = registry.dispatcher(id) else {
        return Ok(());
    };
    let port = target.port();
    port.writing = true;
    port.reading = false;
    target.addr_match(false)
}

/// `write_received`: the controller sent `val`.
pub fn write_received<D: ZephyrDevice, const N: usize>(
    registry: &mut TargetRegistry<'_, ZephyrPort<D>, N>,
    id: usize,
    val: u8,
) -> Result<(), HandlerError> {
    let Some(mut target) = registry.dispatcher(id) else {
        return Ok(());
    };
    target.port().latch = val;
    target.write_request()
}

/// `read_requested`: the controller starts reading. Returns the first byte.
pub fn read_requested<D: ZephyrDevice, const N: usize>(
    registry: &mut TargetRegistry<'_, ZephyrPort<D>, N>,
    id: usize,
) -> Result<u8, HandlerError> {
    let Some(mut target) = registry.dispatcher(id) else {
        return Ok(0);
    };
    let port = target.port();
    port.writing = false;
    if !core::mem::replace(&mut port.reading, true) {
        target.addr_match(true)?;
        target.read_request()?;
    }
    Ok(target.port().latch)
}

/// `read_processed`: the previous byte went out. Returns the next one.
pub fn read_processed<D: ZephyrDevice, const N: usize>(
    registry: &mut TargetRegistry<'_, ZephyrPort<D>, N>,
    id: usize,
) -> Result<u8, HandlerError> {
    let Some(mut target) = registry.dispatcher(id) else {
        return Ok(0);
    };
    target.read_request()?;
    Ok(target.port().latch)
}

/// `stop`: stop condition.
pub fn stop<D: ZephyrDevice, const N: usize>(
    registry: &mut TargetRegistry<'_, ZephyrPort<D>, N>,
    id: usize,
) -> Result<(), HandlerError> {
    let Some(mut target) = registry.dispatcher(id) else {
        return Ok(());
    };
    let port = target.port();
    let idle = !port.writing && !port.reading;
    port.writing = false;
    port.reading = false;
    if idle {
        // A stop without a request is a 0-byte write.
        trace!("i2c target {}: stop without request", id);
        target.addr_match(false)?;
    }
    target.stop()
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, vec, vec::Vec};

    use i2c_target_common::IrqContext;

    use super::*;

    #[derive(Debug)]
    struct Dev {
        name: &'static str,
        fail: Option<i32>,
        registered: Option<(u16, bool)>,
        unregistered: usize,
        limit: StackLimit,
    }

    const BASE: StackLimit = StackLimit {
        top: 0x2000_8000,
        limit: 8192,
    };

    impl Dev {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                fail: None,
                registered: None,
                unregistered: 0,
                limit: BASE,
            }
        }
    }

    impl ZephyrDevice for Dev {
        const ISR_STACK_SIZE: usize = 2048;

        fn name(&self) -> &str {
            self.name
        }

        fn target_register(&mut self, addr: u16, ten_bit: bool) -> Result<(), i32> {
            if let Some(err) = self.fail {
                return Err(err);
            }
            self.registered = Some((addr, ten_bit));
            Ok(())
        }

        fn target_unregister(&mut self) {
            self.unregistered += 1;
            UNREGISTERED.with(|u| u.borrow_mut().push(self.name));
        }

        fn stack_limit(&self) -> StackLimit {
            self.limit
        }

        fn set_stack_limit(&mut self, limit: StackLimit) {
            self.limit = limit;
        }
    }

    type Registry = TargetRegistry<'static, ZephyrPort<Dev>, 2>;

    std::thread_local! {
        static SEEN: RefCell<Vec<u32>> = const { RefCell::new(Vec::new()) };
        static LIMITS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
        static UNREGISTERED: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }

    fn seen() -> Vec<u32> {
        SEEN.with(|s| s.take())
    }

    fn handler(ctx: &mut IrqContext<'_, ZephyrPort<Dev>>) -> Result<(), HandlerError> {
        let flags = ctx.flags();
        SEEN.with(|s| s.borrow_mut().push(flags.bits()));
        let limit = ctx.port().device().stack_limit().limit;
        LIMITS.with(|l| l.borrow_mut().push(limit));
        if flags.contains(Trigger::WRITE_REQ) {
            let mut buf = [0u8];
            ctx.readinto(&mut buf);
            SEEN.with(|s| s.borrow_mut().push(u32::from(buf[0])));
        }
        if flags.contains(Trigger::READ_REQ) {
            ctx.write(b"Y");
        }
        Ok(())
    }

    const AM: u32 = Trigger::ADDR_MATCH.bits();
    const RD: u32 = Trigger::READ_REQ.bits();
    const WR: u32 = Trigger::WRITE_REQ.bits();
    const END: u32 = Trigger::END.bits();

    fn setup(id: usize, mem: Option<&'static mut [u8]>, with_handler: bool) -> Registry {
        let mut reg = Registry::new();
        attach(&mut reg, id, mem, with_handler);
        reg
    }

    fn attach(reg: &mut Registry, id: usize, mem: Option<&'static mut [u8]>, with_handler: bool) {
        let mut config = Config::new(0x42u8);
        config.mem = mem;
        init(reg, id, Dev::new("i2c0"), config).unwrap();
        if with_handler {
            reg.target(id)
                .unwrap()
                .irq(
                    Some(handler),
                    Trigger::ADDR_MATCH | Trigger::READ_REQ | Trigger::WRITE_REQ | Trigger::END,
                    true,
                )
                .unwrap();
        }
        seen();
    }

    #[test]
    fn register_and_display() {
        let mut reg = setup(0, None, false);
        let port = reg.port_mut(0).unwrap();
        assert_eq!(port.device().registered, Some((0x42, false)));
        assert_eq!(std::format!("{}", port), "I2CTarget(i2c0, addr=66)");
    }

    #[test]
    fn register_failure_is_an_os_error() {
        let mut reg = Registry::new();
        let mut dev = Dev::new("i2c1");
        dev.fail = Some(-16);
        assert_eq!(
            init(&mut reg, 1, dev, Config::new(0x42u8)),
            Err(Error::Os(16))
        );
        assert!(reg.port(1).is_none());
    }

    #[test]
    fn scan_is_a_stop_without_request() {
        let mut reg = setup(0, None, true);
        stop(&mut reg, 0).unwrap();
        assert_eq!(seen(), vec![AM, END]);
    }

    #[test]
    fn write() {
        let mut reg = setup(0, None, true);
        write_requested(&mut reg, 0).unwrap();
        for &b in b"XYZ" {
            write_received(&mut reg, 0, b).unwrap();
        }
        stop(&mut reg, 0).unwrap();
        assert_eq!(
            seen(),
            vec![AM, WR, u32::from(b'X'), WR, u32::from(b'Y'), WR, u32::from(b'Z'), END]
        );
    }

    #[test]
    fn read_with_requested_once() {
        let mut reg = setup(0, None, true);
        assert_eq!(read_requested(&mut reg, 0), Ok(b'Y'));
        assert_eq!(read_processed(&mut reg, 0), Ok(b'Y'));
        stop(&mut reg, 0).unwrap();
        assert_eq!(seen(), vec![AM, RD, RD, END]);
    }

    #[test]
    fn read_with_requested_every_byte_matches_once() {
        let mut reg = setup(0, None, true);
        for _ in 0..3 {
            assert_eq!(read_requested(&mut reg, 0), Ok(b'Y'));
            assert_eq!(read_processed(&mut reg, 0), Ok(b'Y'));
        }
        stop(&mut reg, 0).unwrap();
        assert_eq!(seen(), vec![AM, RD, RD, RD, RD, END]);
    }

    #[test]
    fn write_then_read_with_requested_every_byte() {
        let mut reg = setup(0, None, true);
        write_requested(&mut reg, 0).unwrap();
        write_received(&mut reg, 0, b'X').unwrap();
        for _ in 0..2 {
            read_requested(&mut reg, 0).unwrap();
            read_processed(&mut reg, 0).unwrap();
        }
        stop(&mut reg, 0).unwrap();
        assert_eq!(seen(), vec![AM, WR, u32::from(b'X'), AM, RD, RD, RD, END]);
    }

    #[test]
    fn read_with_requested_every_byte() {
        let mut reg = setup(0, Some(b"01234567".to_vec().leak()), false);
        write_requested(&mut reg, 0).unwrap();
        write_received(&mut reg, 0, 6).unwrap();
        let mut out = Vec::new();
        for _ in 0..4 {
            out.push(read_requested(&mut reg, 0).unwrap());
            read_processed(&mut reg, 0).unwrap();
        }
        stop(&mut reg, 0).unwrap();
        // Each read_requested after the first hands out what read_processed
        // prepared.
        assert_eq!(out, b"6701".to_vec());
    }

    #[test]
    fn eeprom_write() {
        let mut reg = setup(0, Some(b"01234567".to_vec().leak()), false);
        write_requested(&mut reg, 0).unwrap();
        for &b in b"\x06test" {
            write_received(&mut reg, 0, b).unwrap();
        }
        stop(&mut reg, 0).unwrap();
        assert_eq!(reg.data(0).unwrap().mem().unwrap(), b"st2345te");
    }

    #[test]
    fn write_then_read() {
        let mut reg = setup(0, None, true);
        write_requested(&mut reg, 0).unwrap();
        write_received(&mut reg, 0, b'X').unwrap();
        read_requested(&mut reg, 0).unwrap();
        read_processed(&mut reg, 0).unwrap();
        stop(&mut reg, 0).unwrap();
        assert_eq!(seen(), vec![AM, WR, u32::from(b'X'), AM, RD, RD, END]);
    }

    #[test]
    fn handler_runs_with_widened_stack_check() {
        let mut reg = setup(0, None, true);
        LIMITS.with(|l| l.take());
        stop(&mut reg, 0).unwrap();
        assert_eq!(
            LIMITS.with(|l| l.take()),
            vec![Dev::ISR_STACK_SIZE - ISR_STACK_MARGIN; 2]
        );
        assert_eq!(reg.port_mut(0).unwrap().device().limit, BASE);
    }

    #[test]
    fn transfer_flags_are_per_instance() {
        let mut reg = setup(0, None, true);
        attach(&mut reg, 1, None, true);
        read_requested(&mut reg, 0).unwrap();
        read_requested(&mut reg, 1).unwrap();
        assert_eq!(seen(), vec![AM, RD, AM, RD]);
    }

    #[test]
    fn reinit_unregisters_the_previous_device() {
        let mut reg = setup(0, None, false);
        UNREGISTERED.with(|u| u.take());
        init(&mut reg, 0, Dev::new("i2c0-new"), Config::new(0x43u8)).unwrap();
        assert_eq!(UNREGISTERED.with(|u| u.take()), vec!["i2c0"]);
        let port = reg.port_mut(0).unwrap();
        assert_eq!(port.addr(), 0x43);
        assert_eq!(port.device().registered, Some((0x43, false)));
    }

    #[test]
    fn deinit_unregisters_once() {
        let mut reg = setup(0, None, false);
        let mut target = reg.target(0).unwrap();
        target.deinit();
        target.deinit();
        assert_eq!(target.port().device().unregistered, 1);
    }
}
