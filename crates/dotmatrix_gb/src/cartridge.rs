use std::path::Path;

use anyhow::{ensure, Context, Result};

use crate::address_map::{CARTRIDGE_ROM_END, CARTRIDGE_ROM_SIZE, CARTRIDGE_TYPE};
use crate::component::Component;

/// A cartridge without a memory bank controller: 32 KiB of ROM mapped at
/// 0x0000..0x8000, writes ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cartridge {
    rom: Box<[u8]>,
}

impl Cartridge {
    pub fn from_bytes(rom: Vec<u8>) -> Result<Self> {
        ensure!(
            rom.len() == CARTRIDGE_ROM_SIZE,
            "cartridge ROM must be {CARTRIDGE_ROM_SIZE} bytes, got {}",
            rom.len()
        );
        let kind = rom[usize::from(CARTRIDGE_TYPE)];
        ensure!(kind == 0, "unsupported cartridge type {kind:#04X}");
        log::info!("loaded ROM-only cartridge '{}'", title(&rom));
        Ok(Self {
            rom: rom.into_boxed_slice(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rom = std::fs::read(path)
            .with_context(|| format!("failed to read ROM '{}'", path.display()))?;
        Self::from_bytes(rom).with_context(|| format!("invalid ROM '{}'", path.display()))
    }

    pub fn title(&self) -> String {
        title(&self.rom)
    }
}

/// Header title at 0x0134..0x0144, NUL-padded ASCII.
fn title(rom: &[u8]) -> String {
    rom[0x134..0x144]
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect()
}

impl Component for Cartridge {
    fn read(&self, address: u16) -> Option<u8> {
        (address < CARTRIDGE_ROM_END).then(|| self.rom[usize::from(address)])
    }

    fn write(&mut self, _address: u16, _data: u8) {}
}
