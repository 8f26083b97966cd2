//! Plain memory blocks and the controllers mapping them onto the bus.

mod boot_rom;
mod ram;

pub use boot_rom::{BootRom, BootRomController};
pub use ram::{Ram, RamController};
