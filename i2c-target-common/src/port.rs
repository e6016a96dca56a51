//! Port hardware binding contract

use crate::Trigger;

/// Byte transfer primitives of one controller instance
///
/// Each supported controller family implements this once. Only one binding is
/// compiled into a firmware image so everything is statically dispatched.
///
/// None of these methods may block: they are called from the controller's
/// interrupt handler.
pub trait TargetPort {
    /// Drains up to `buf.len()` bytes that are already in the receive queue.
    ///
    /// Returns the number of bytes read, possibly zero. The receive interrupt must
    /// be re-armed on exit whatever the outcome.
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize;

    /// Pushes bytes to the transmit register, at most one on most controllers.
    ///
    /// Returns the number of bytes accepted. The transmit-request interrupt must be
    /// re-armed on exit.
    fn write_bytes(&mut self, buf: &[u8]) -> usize;

    /// Enables the hardware notification sources needed for `trigger`.
    ///
    /// An empty trigger disables notifications. Ports that keep every interrupt
    /// enabled implement this as a no-op.
    fn irq_config(&mut self, trigger: Trigger);

    /// Disables interrupts and powers the controller down. Must be idempotent.
    fn deinit(&mut self);

    /// Wraps every invocation of the user handler.
    ///
    /// Ports override this when the handler needs a different execution
    /// environment than the bare interrupt.
    fn event_callback<R>(&mut self, handler: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        handler(self)
    }
}
