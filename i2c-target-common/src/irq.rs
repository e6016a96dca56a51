//! IRQ subscription objects

use crate::{HandlerError, TargetPort, Trigger};

/// User callback invoked in interrupt context
///
/// Returning an error aborts the dispatch of the current hardware interrupt; the
/// error is handed back unchanged to the code running the interrupt handler.
pub type Handler<P> = fn(&mut IrqContext<'_, P>) -> Result<(), HandlerError>;

/// IRQ subscription of one controller instance
///
/// Allocated on first use and kept until the registry is reset.
pub struct Irq<P> {
    pub(crate) handler: Option<Handler<P>>,
    pub(crate) trigger: Trigger,
    pub(crate) flags: Trigger,
    pub(crate) hard: bool,
}

impl<P> Irq<P> {
    pub(crate) const fn new() -> Self {
        Self {
            handler: None,
            trigger: Trigger::empty(),
            flags: Trigger::empty(),
            hard: false,
        }
    }

    /// Events the handler is subscribed to.
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Events delivered by the most recent handler invocation.
    ///
    /// Each delivery overwrites the previous value; reconfiguring the trigger
    /// clears it.
    pub fn flags(&self) -> Trigger {
        self.flags
    }

    /// Whether a handler is installed.
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Whether the handler runs directly in interrupt context.
    pub fn is_hard(&self) -> bool {
        self.hard
    }
}

impl<P> core::fmt::Debug for Irq<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Irq")
            .field("handler", &self.handler.is_some())
            .field("trigger", &self.trigger)
            .field("flags", &self.flags)
            .field("hard", &self.hard)
            .finish()
    }
}

/// What a handler can see and do while it runs
pub struct IrqContext<'a, P> {
    pub(crate) id: usize,
    pub(crate) flags: Trigger,
    pub(crate) port: &'a mut P,
}

impl<P: TargetPort> IrqContext<'_, P> {
    /// Index of the controller instance that raised the event.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Events being delivered.
    pub fn flags(&self) -> Trigger {
        self.flags
    }

    /// Supplies bytes for a pending read request.
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.port.write_bytes(data)
    }

    /// Takes bytes of a pending write request.
    pub fn readinto(&mut self, buf: &mut [u8]) -> usize {
        self.port.read_bytes(buf)
    }

    /// The port binding of the instance.
    pub fn port(&mut self) -> &mut P {
        self.port
    }
}
