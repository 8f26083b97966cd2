//! The composition root: owns every device and clocks them in order.

use anyhow::{ensure, Result};
use dotmatrix_common::key::Key;
use dotmatrix_common::Color;
use typed_builder::TypedBuilder;

use crate::address_map::{
    ECHO_RAM_END, ECHO_RAM_START, REG_BGP, REG_LCDC, WORK_RAM_SIZE, WORK_RAM_START,
};
use crate::bus::{Bus, OPEN_BUS};
use crate::cartridge::Cartridge;
use crate::component::{Clocked, Component};
use crate::cpu::Cpu;
use crate::joypad::{Button, Joypad};
use crate::lcd::{LcdController, LcdImage, FRAME_CYCLES};
use crate::memory::{BootRom, BootRomController, Ram, RamController};
use crate::timer::Timer;
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// What to plug into a new [`GameBoy`].
///
/// ```ignore
/// let config = GameBoyConfig::builder()
///     .cartridge(Cartridge::from_file("game.gb")?)
///     .boot_rom(BootRom::from_file("dmg_boot.bin")?)
///     .build();
/// ```
#[derive(TypedBuilder)]
pub struct GameBoyConfig {
    cartridge: Cartridge,
    /// Without one the machine starts from the state the boot ROM leaves behind.
    #[builder(default, setter(strip_option))]
    boot_rom: Option<BootRom>,
}

/// DMG LCDC and BGP values once the boot ROM hands over to the cartridge.
const POST_BOOT_LCDC: u8 = 0x91;
const POST_BOOT_BGP: u8 = 0xFC;

/// A complete DMG machine.
///
/// Devices are clocked once per machine cycle in the order joypad, timer,
/// LCD, CPU. Each sees a bus made of the other devices; all but the CPU get
/// the CPU as their interrupt sink.
pub struct GameBoy {
    cpu: Cpu,
    lcd: LcdController,
    timer: Timer,
    joypad: Joypad,
    rom: BootRomController,
    work_ram: RamController,
    cycle: u64,
}

impl GameBoy {
    /// A machine running `cartridge` from the post-boot state.
    pub fn new(cartridge: Cartridge) -> Self {
        Self::with_config(GameBoyConfig::builder().cartridge(cartridge).build())
    }

    pub fn with_config(config: GameBoyConfig) -> Self {
        let post_boot = config.boot_rom.is_none();
        let work_ram = RamController::new(Ram::new(WORK_RAM_SIZE), WORK_RAM_START)
            .with_mirror(ECHO_RAM_START..ECHO_RAM_END);
        let mut gb = Self {
            cpu: Cpu::new(),
            lcd: LcdController::new(),
            timer: Timer::new(),
            joypad: Joypad::new(),
            rom: BootRomController::new(config.cartridge, config.boot_rom),
            work_ram,
            cycle: 0,
        };
        if post_boot {
            gb.cpu.apply_post_boot_state();
            gb.lcd.write(REG_LCDC, POST_BOOT_LCDC);
            gb.lcd.write(REG_BGP, POST_BOOT_BGP);
        }
        log::info!(
            "Game Boy ready, {}",
            if post_boot { "skipping boot ROM" } else { "running boot ROM" }
        );
        gb
    }

    /// Master cycle count: the next tick to run.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn lcd(&self) -> &LcdController {
        &self.lcd
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn joypad(&self) -> &Joypad {
        &self.joypad
    }

    pub fn is_boot_rom_mapped(&self) -> bool {
        self.rom.is_boot_rom_mapped()
    }

    /// Reads `address` the way the CPU would, without side effects.
    pub fn peek(&self, address: u16) -> u8 {
        let devices: [&dyn Component; 6] = [
            &self.rom,
            &self.work_ram,
            &self.lcd,
            &self.timer,
            &self.joypad,
            &self.cpu,
        ];
        devices
            .iter()
            .find_map(|device| device.read(address))
            .unwrap_or(OPEN_BUS)
    }

    /// Runs every tick before `cycle`.
    pub fn run_until(&mut self, cycle: u64) -> Result<()> {
        ensure!(
            cycle >= self.cycle,
            "cannot run back to cycle {cycle}, already at {}",
            self.cycle
        );
        while self.cycle < cycle {
            self.tick()?;
            self.cycle += 1;
        }
        Ok(())
    }

    /// Advances one display frame period.
    pub fn step_frame(&mut self) -> Result<()> {
        self.run_until(self.cycle + FRAME_CYCLES)
    }

    fn tick(&mut self) -> Result<()> {
        let cycle = self.cycle;
        {
            let mut devices: [&mut dyn Component; 0] = [];
            let mut bus = Bus::new(&mut devices).with_interrupts(&mut self.cpu);
            self.joypad.cycle(cycle, &mut bus)?;
            self.timer.cycle(cycle, &mut bus)?;
        }
        {
            let mut devices: [&mut dyn Component; 4] = [
                &mut self.rom,
                &mut self.work_ram,
                &mut self.timer,
                &mut self.joypad,
            ];
            let mut bus = Bus::new(&mut devices).with_interrupts(&mut self.cpu);
            self.lcd.cycle(cycle, &mut bus)?;
        }
        let mut devices: [&mut dyn Component; 5] = [
            &mut self.rom,
            &mut self.work_ram,
            &mut self.lcd,
            &mut self.timer,
            &mut self.joypad,
        ];
        let mut bus = Bus::new(&mut devices);
        self.cpu.cycle(cycle, &mut bus)
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.joypad.set_button(button, pressed);
    }

    /// Forwards a host key: arrows to the D-pad, Z/X to A/B, A/S to
    /// Select/Start. Other keys are ignored.
    pub fn handle_key(&mut self, key: Key, pressed: bool) {
        let button = match key {
            Key::Right => Button::Right,
            Key::Left => Button::Left,
            Key::Up => Button::Up,
            Key::Down => Button::Down,
            Key::Z => Button::A,
            Key::X => Button::B,
            Key::A => Button::Select,
            Key::S => Button::Start,
            _ => return,
        };
        self.set_button(button, pressed);
    }

    /// The last complete frame, all colour 0 before the first one.
    pub fn current_image(&self) -> &LcdImage {
        self.lcd.current_image()
    }

    /// Writes the current frame as packed RGB24, row by row. Fills as many
    /// whole pixels as `buffer` holds.
    pub fn video_frame(&self, buffer: &mut [u8]) {
        let image = self.current_image();
        let pixels = (0..SCREEN_HEIGHT).flat_map(|y| (0..SCREEN_WIDTH).map(move |x| (x, y)));
        for (rgb, (x, y)) in buffer.chunks_exact_mut(3).zip(pixels) {
            let (r, g, b) = Color::dmg_shade(image.get(x, y)).rgb();
            rgb.copy_from_slice(&[r, g, b]);
        }
    }
}
