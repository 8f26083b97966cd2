pub mod address_map;
pub mod bits;
pub mod bus;
pub mod cartridge;
pub mod component;
pub mod cpu;
pub mod joypad;
pub mod lcd;
pub mod machine;
pub mod memory;
pub mod register_file;
pub mod timer;

pub use cartridge::Cartridge;
pub use joypad::Button;
pub use machine::{GameBoy, GameBoyConfig};
pub use memory::BootRom;

/// Logical screen width in pixels for the Game Boy DMG.
pub const SCREEN_WIDTH: usize = 160;
/// Logical screen height in pixels.
pub const SCREEN_HEIGHT: usize = 144;
/// Machine cycles per emulated second.
pub const CYCLES_PER_SECOND: u64 = 1 << 20;
