use std::path::PathBuf;

use anyhow::{Context, Result};
use dotmatrix_common::key::Key;
use dotmatrix_gb::{BootRom, Cartridge, GameBoy, GameBoyConfig, SCREEN_HEIGHT, SCREEN_WIDTH};
use typed_builder::TypedBuilder;

/// Bytes in one RGB24 frame dump.
pub const FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 3;

/// A headless run that ends by writing the last frame to disk.
#[derive(Debug, TypedBuilder)]
pub struct DumpOptions {
    #[builder(setter(into))]
    pub rom: PathBuf,
    #[builder(setter(into))]
    pub out: PathBuf,
    #[builder(default, setter(into))]
    pub boot_rom: Option<PathBuf>,
    #[builder(default = 60)]
    pub frames: u32,
    /// Keys held down for the whole run.
    #[builder(default)]
    pub held_keys: Vec<Key>,
}

/// Builds the machine described by `options`, runs it and returns the frame
/// that was written.
pub fn run_dump(options: &DumpOptions) -> Result<Vec<u8>> {
    let cartridge = Cartridge::from_file(&options.rom)?;
    let config = match &options.boot_rom {
        Some(path) => GameBoyConfig::builder()
            .cartridge(cartridge)
            .boot_rom(BootRom::from_file(path)?)
            .build(),
        None => GameBoyConfig::builder().cartridge(cartridge).build(),
    };
    let mut gb = GameBoy::with_config(config);
    for &key in &options.held_keys {
        gb.handle_key(key, true);
    }

    for frame in 0..options.frames {
        gb.step_frame()
            .with_context(|| format!("emulation stopped during frame {frame}"))?;
    }
    log::debug!("ran {} cycles", gb.cycles());

    let mut buffer = vec![0u8; FRAME_BYTES];
    gb.video_frame(&mut buffer);
    std::fs::write(&options.out, &buffer)
        .with_context(|| format!("failed to write '{}'", options.out.display()))?;
    Ok(buffer)
}
