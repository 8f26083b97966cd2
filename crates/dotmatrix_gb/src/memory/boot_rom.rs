use std::path::Path;

use anyhow::{ensure, Context, Result};

use crate::address_map::{BOOT_ROM_END, BOOT_ROM_SIZE, REG_BOOT_ROM_DISABLE};
use crate::cartridge::Cartridge;
use crate::component::Component;

/// The 256-byte program the console runs before handing over to the cartridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootRom {
    data: Box<[u8]>,
}

impl BootRom {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        ensure!(
            data.len() == BOOT_ROM_SIZE,
            "boot ROM must be {BOOT_ROM_SIZE} bytes, got {}",
            data.len()
        );
        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read boot ROM '{}'", path.display()))?;
        Self::from_bytes(data)
    }
}

/// Overlays the boot ROM on the start of the cartridge until the program
/// writes to the disable register.
#[derive(Debug)]
pub struct BootRomController {
    boot_rom: Option<BootRom>,
    cartridge: Cartridge,
}

impl BootRomController {
    pub fn new(cartridge: Cartridge, boot_rom: Option<BootRom>) -> Self {
        Self {
            boot_rom,
            cartridge,
        }
    }

    pub fn is_boot_rom_mapped(&self) -> bool {
        self.boot_rom.is_some()
    }
}

impl Component for BootRomController {
    fn read(&self, address: u16) -> Option<u8> {
        match &self.boot_rom {
            Some(boot_rom) if address < BOOT_ROM_END => Some(boot_rom.data[usize::from(address)]),
            _ => self.cartridge.read(address),
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        if address == REG_BOOT_ROM_DISABLE && self.boot_rom.take().is_some() {
            log::debug!("boot ROM unmapped");
        }
        self.cartridge.write(address, data);
    }
}
