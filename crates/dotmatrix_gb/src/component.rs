use anyhow::Result;

use crate::bus::Bus;

/// A device attached to the address bus.
pub trait Component {
    /// Returns `None` for addresses the component does not own.
    fn read(&self, address: u16) -> Option<u8>;

    /// Writes to addresses the component does not own are ignored.
    fn write(&mut self, address: u16, data: u8);
}

/// A device driven by the master clock.
///
/// The machine calls `cycle` exactly once per tick with a monotonically
/// increasing cycle number. `bus` gives access to every other device.
pub trait Clocked {
    fn cycle(&mut self, cycle: u64, bus: &mut Bus<'_, '_>) -> Result<()>;
}
