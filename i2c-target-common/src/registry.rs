//! Fixed-capacity registry of target instances
//!
//! Every controller instance owns one slot, addressed by its index: the protocol
//! state, the lazily allocated IRQ subscription and the installed port binding all
//! live there. Protocol calls are always made on behalf of an explicit instance, so
//! several controllers can be served independently.
//!
//! A registry is typically kept in a [`SharedRegistry`](crate::SharedRegistry) so
//! that both thread mode and the interrupt handlers can reach it.

use crate::{
    irq::IrqContext,
    target::Received,
    Config, Error, Handler, HandlerError, Irq, State, TargetData, TargetPort, Trigger,
    ValidAddress,
};

/// Slots for up to `N` controller instances
pub struct TargetRegistry<'m, P, const N: usize> {
    data: [TargetData<'m>; N],
    irqs: [Option<Irq<P>>; N],
    ports: [Option<P>; N],
}

impl<'m, P, const N: usize> TargetRegistry<'m, P, N> {
    /// Number of instance slots.
    pub const CAPACITY: usize = N;

    /// Empty registry, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            data: [const { TargetData::new() }; N],
            irqs: [const { None }; N],
            ports: [const { None }; N],
        }
    }

    /// Checks that `id` names a slot of this registry.
    pub fn check_id(&self, id: usize) -> Result<(), Error> {
        if id < N {
            Ok(())
        } else {
            Err(Error::InvalidId(id))
        }
    }

    /// Protocol state of an instance.
    pub fn data(&self, id: usize) -> Option<&TargetData<'m>> {
        self.data.get(id)
    }

    /// IRQ subscription of an instance, if one was ever requested.
    pub fn irq(&self, id: usize) -> Option<&Irq<P>> {
        self.irqs.get(id)?.as_ref()
    }

    /// Installed port binding of an instance.
    pub fn port(&self, id: usize) -> Option<&P> {
        self.ports.get(id)?.as_ref()
    }

    /// Installed port binding of an instance.
    pub fn port_mut(&mut self, id: usize) -> Option<&mut P> {
        self.ports.get_mut(id)?.as_mut()
    }

    #[allow(clippy::type_complexity)]
    fn parts(
        &mut self,
        id: usize,
    ) -> Option<(usize, &mut TargetData<'m>, &mut Option<Irq<P>>, &mut P)> {
        let port = self.ports.get_mut(id)?.as_mut()?;
        Some((id, &mut self.data[id], &mut self.irqs[id], port))
    }
}

impl<'m, P: TargetPort, const N: usize> TargetRegistry<'m, P, N> {
    /// Configures instance `id` as a target served by `port`.
    ///
    /// The protocol state restarts from [`State::Idle`] with the buffer of
    /// `config`. Any IRQ subscription of the slot is kept. Returns the port that
    /// was previously installed in the slot, if any.
    pub fn attach<A: ValidAddress>(
        &mut self,
        id: usize,
        port: P,
        config: Config<'m, A>,
    ) -> Result<Option<P>, Error> {
        self.check_id(id)?;
        let mem_addrsize = config.validate()?;
        self.data[id].init(config.mem, mem_addrsize);
        debug!("i2c target {}: attached", id);
        Ok(self.ports[id].replace(port))
    }

    /// User facing handle of instance `id`.
    pub fn target(&mut self, id: usize) -> Result<Target<'_, 'm, P>, Error> {
        self.check_id(id)?;
        let (id, data, irq, port) = self.parts(id).ok_or(Error::NotInitialised(id))?;
        Ok(Target {
            id,
            data,
            irq,
            port,
        })
    }

    /// Protocol handle of instance `id`, for the port binding's interrupt handler.
    ///
    /// `None` if nothing is installed in the slot.
    pub fn dispatcher(&mut self, id: usize) -> Option<Dispatcher<'_, 'm, P>> {
        let (id, data, irq, port) = self.parts(id)?;
        Some(Dispatcher {
            id,
            data,
            irq,
            port,
        })
    }

    /// Soft reset: deinitialises every port and forgets every borrowed buffer,
    /// subscription and binding.
    pub fn deinit_all(&mut self) {
        for ((data, irq), port) in self
            .data
            .iter_mut()
            .zip(self.irqs.iter_mut())
            .zip(self.ports.iter_mut())
        {
            if let Some(mut port) = port.take() {
                port.deinit();
            }
            *irq = None;
            data.clear();
        }
        debug!("i2c target registry reset");
    }
}

impl<P, const N: usize> Default for TargetRegistry<'_, P, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// User facing API of a configured target
pub struct Target<'r, 'm, P> {
    id: usize,
    data: &'r mut TargetData<'m>,
    irq: &'r mut Option<Irq<P>>,
    port: &'r mut P,
}

impl<'m, P: TargetPort> Target<'_, 'm, P> {
    /// Index of the controller instance.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Protocol state.
    pub fn data(&self) -> &TargetData<'m> {
        self.data
    }

    /// The port binding.
    pub fn port(&mut self) -> &mut P {
        self.port
    }

    /// Drains bytes already received from the controller, without blocking.
    pub fn readinto(&mut self, buf: &mut [u8]) -> usize {
        self.port.read_bytes(buf)
    }

    /// Offers bytes for the controller to read, without blocking.
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.port.write_bytes(data)
    }

    /// Installs `handler` for the events in `trigger`.
    ///
    /// Notifications are disabled while the subscription is updated and only
    /// re-enabled when there is both a handler and a non-empty trigger. Handlers
    /// always run in interrupt context, so `hard` must be `true`.
    pub fn irq(
        &mut self,
        handler: Option<Handler<P>>,
        trigger: Trigger,
        hard: bool,
    ) -> Result<&Irq<P>, Error> {
        if !hard {
            return Err(Error::HardIrqRequired);
        }

        self.port.irq_config(Trigger::empty());

        let irq = self.irq.get_or_insert_with(Irq::new);
        irq.handler = handler;
        irq.hard = hard;
        irq.flags = Trigger::empty();
        irq.trigger = trigger;

        if handler.is_some() && !trigger.is_empty() {
            self.port.irq_config(trigger);
        }
        Ok(irq)
    }

    /// The IRQ subscription, allocated empty on first use.
    pub fn irq_info(&mut self) -> &Irq<P> {
        self.irq.get_or_insert_with(Irq::new)
    }

    /// Replaces the trigger mask of the subscription and clears its flags.
    pub fn set_trigger(&mut self, trigger: Trigger) {
        self.port.irq_config(Trigger::empty());
        let irq = self.irq.get_or_insert_with(Irq::new);
        irq.flags = Trigger::empty();
        irq.trigger = trigger;
        self.port.irq_config(trigger);
    }

    /// Events delivered by the most recent handler invocation.
    pub fn irq_flags(&self) -> Trigger {
        self.irq.as_ref().map_or(Trigger::empty(), Irq::flags)
    }

    /// Subscribed events.
    pub fn irq_trigger(&self) -> Trigger {
        self.irq.as_ref().map_or(Trigger::empty(), Irq::trigger)
    }

    /// Disables the controller. Calling it again has no further effect.
    pub fn deinit(&mut self) {
        self.port.deinit();
        self.data.close();
        debug!("i2c target {}: deinit", self.id);
    }
}

/// Protocol entry points used by port bindings
///
/// Each call corresponds to one decoded hardware condition. A handler error stops
/// the current call and is returned as is; the state transition of the call has
/// already been committed at that point.
pub struct Dispatcher<'r, 'm, P> {
    id: usize,
    data: &'r mut TargetData<'m>,
    irq: &'r mut Option<Irq<P>>,
    port: &'r mut P,
}

impl<'m, P: TargetPort> Dispatcher<'_, 'm, P> {
    /// Index of the controller instance.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The port binding.
    pub fn port(&mut self) -> &mut P {
        self.port
    }

    /// Protocol state.
    pub fn data(&self) -> &TargetData<'m> {
        self.data
    }

    /// The controller addressed this target, `read` giving the direction.
    ///
    /// A memory transfer still open from a start without a stop is closed first.
    pub fn addr_match(&mut self, read: bool) -> Result<(), HandlerError> {
        trace!("i2c target {}: address match, read={}", self.id, read);
        self.close()?;
        self.event(Trigger::ADDR_MATCH)?;
        Ok(())
    }

    /// The controller is waiting for the next byte.
    pub fn read_request(&mut self) -> Result<(), HandlerError> {
        let handled = self.event(Trigger::READ_REQ)?;
        if self.data.has_mem() {
            if self.data.begin_read() {
                self.event(Trigger::READ_START)?;
            }
            if let Some(val) = self.data.read_byte() {
                self.port.write_bytes(&[val]);
            }
        } else if !handled {
            // No data source, keep the bus going with a zero.
            self.port.write_bytes(&[0]);
        }
        Ok(())
    }

    /// The controller sent a byte.
    pub fn write_request(&mut self) -> Result<(), HandlerError> {
        let handled = self.event(Trigger::WRITE_REQ)?;
        if !self.data.has_mem() {
            if !handled {
                // No data sink, drop the byte so reception can continue.
                let mut discard = [0u8];
                self.port.read_bytes(&mut discard);
            }
            return Ok(());
        }

        let mut val = [0u8];
        if self.port.read_bytes(&mut val) == 0 {
            return Ok(());
        }
        match self.data.receive_byte(val[0]) {
            Some(Received::AddrSelected) => {
                self.event(Trigger::MEM_ADDR_MATCH)?;
            }
            Some(Received::FirstData) => {
                self.event(Trigger::WRITE_START)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// The transfer ended with a repeated start or a stop the port cannot tell apart.
    pub fn restart_or_stop(&mut self) -> Result<(), HandlerError> {
        self.close()?;
        self.event(Trigger::END)?;
        Ok(())
    }

    /// The transfer ended with a stop condition.
    pub fn stop(&mut self) -> Result<(), HandlerError> {
        self.close()?;
        self.event(Trigger::END | Trigger::STOP)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), HandlerError> {
        match self.data.close() {
            State::Reading => self.event(Trigger::READ_END).map(drop),
            State::Writing => self.event(Trigger::WRITE_END).map(drop),
            State::Idle | State::MemAddrSelected => Ok(()),
        }
    }

    /// Delivers `kind` to the subscribed handler.
    ///
    /// Returns whether a handler ran.
    fn event(&mut self, kind: Trigger) -> Result<bool, HandlerError> {
        let Some(irq) = self.irq.as_mut() else {
            return Ok(false);
        };
        let Some(handler) = irq.handler else {
            return Ok(false);
        };
        let flags = irq.trigger & kind;
        if flags.is_empty() {
            return Ok(false);
        }
        irq.flags = flags;

        let id = self.id;
        self.port
            .event_callback(|port| handler(&mut IrqContext { id, flags, port }))?;
        Ok(true)
    }
}
