//! Registry shared between thread mode and interrupt handlers

use core::cell::RefCell;

use critical_section::Mutex;

use crate::TargetRegistry;

/// A [`TargetRegistry`] behind a critical section mutex, usable as a `static`
///
/// ```
/// use i2c_target_common::{SharedRegistry, TargetPort, Trigger};
///
/// struct NoPort;
/// impl TargetPort for NoPort {
///     fn read_bytes(&mut self, _: &mut [u8]) -> usize { 0 }
///     fn write_bytes(&mut self, _: &[u8]) -> usize { 0 }
///     fn irq_config(&mut self, _: Trigger) {}
///     fn deinit(&mut self) {}
/// }
///
/// static TARGETS: SharedRegistry<'static, NoPort, 2> = SharedRegistry::new();
///
/// // From the interrupt handler of controller 1:
/// let result = TARGETS.with(|reg| match reg.dispatcher(1) {
///     Some(mut d) => d.stop(),
///     None => Ok(()),
/// });
/// assert!(result.is_ok());
/// ```
pub struct SharedRegistry<'m, P, const N: usize> {
    inner: Mutex<RefCell<TargetRegistry<'m, P, N>>>,
}

impl<'m, P, const N: usize> SharedRegistry<'m, P, N> {
    /// Empty registry.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(TargetRegistry::new())),
        }
    }

    /// Runs `f` on the registry inside a critical section.
    ///
    /// # Panics
    ///
    /// If called re-entrantly from within `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut TargetRegistry<'m, P, N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }
}

impl<P, const N: usize> Default for SharedRegistry<'_, P, N> {
    fn default() -> Self {
        Self::new()
    }
}
