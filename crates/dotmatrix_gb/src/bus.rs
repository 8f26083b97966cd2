use crate::component::Component;
use crate::cpu::Interrupt;

/// Value read from an address no device answers for (pulled-up data lines).
pub const OPEN_BUS: u8 = 0xFF;

/// Receiver of interrupt requests; implemented by the processor.
///
/// The sink is also a device: a bus built with one routes reads and writes
/// to it after the listed components.
pub trait InterruptSink: Component {
    /// Sets the request bit of `interrupt`. Requesting twice is harmless.
    fn request_interrupt(&mut self, interrupt: Interrupt);
}

/// Address-space dispatcher over borrowed devices.
///
/// The machine assembles a `Bus` on the stack for each clocked device,
/// leaving that device out of the list, so the bus owns nothing and never
/// allocates.
pub struct Bus<'a, 'c> {
    components: &'a mut [&'c mut dyn Component],
    interrupts: Option<&'a mut dyn InterruptSink>,
}

impl<'a, 'c> Bus<'a, 'c> {
    pub fn new(components: &'a mut [&'c mut dyn Component]) -> Self {
        Self {
            components,
            interrupts: None,
        }
    }

    /// Routes [`Bus::request_interrupt`] to `sink`.
    pub fn with_interrupts(mut self, sink: &'a mut dyn InterruptSink) -> Self {
        self.interrupts = Some(sink);
        self
    }

    /// First answer in attachment order, then the sink's, or [`OPEN_BUS`].
    pub fn read(&self, address: u16) -> u8 {
        self.components
            .iter()
            .find_map(|component| component.read(address))
            .or_else(|| self.interrupts.as_ref().and_then(|sink| sink.read(address)))
            .unwrap_or(OPEN_BUS)
    }

    /// Broadcasts to every attached device and the sink.
    pub fn write(&mut self, address: u16, data: u8) {
        for component in self.components.iter_mut() {
            component.write(address, data);
        }
        if let Some(sink) = self.interrupts.as_mut() {
            sink.write(address, data);
        }
    }

    /// # Panics
    ///
    /// Panics if the bus was built without an interrupt sink.
    pub fn request_interrupt(&mut self, interrupt: Interrupt) {
        match self.interrupts.as_mut() {
            Some(sink) => sink.request_interrupt(interrupt),
            None => panic!("{interrupt:?} requested on a bus without an interrupt sink"),
        }
    }
}
