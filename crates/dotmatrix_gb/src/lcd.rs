//! Display controller: mode timing, OAM DMA and scanline composition.

pub mod image;
pub mod image_line;
mod render;

use anyhow::Result;

use crate::address_map::{
    OAM_END, OAM_RAM_SIZE, OAM_START, REGS_LCDC_END, REGS_LCDC_START, VIDEO_RAM_END,
    VIDEO_RAM_SIZE, VIDEO_RAM_START,
};
use crate::bits::{self, Bit};
use crate::bus::Bus;
use crate::component::{Clocked, Component};
use crate::cpu::Interrupt;
use crate::memory::Ram;
use crate::register_file::{Register, RegisterFile};
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub use image::LcdImage;
pub use image_line::LcdImageLine;

const MODE2_CYCLES: u64 = 20;
const MODE3_CYCLES: u64 = 43;
const MODE0_CYCLES: u64 = 51;
pub const LINE_CYCLES: u64 = MODE2_CYCLES + MODE3_CYCLES + MODE0_CYCLES;
/// Visible lines followed by the vertical blank.
pub const LINES_PER_FRAME: u64 = 154;
pub const FRAME_CYCLES: u64 = LINE_CYCLES * LINES_PER_FRAME;

const LAST_VISIBLE_LINE: u8 = SCREEN_HEIGHT as u8 - 1;
const LAST_LINE: u8 = LINES_PER_FRAME as u8 - 1;

/// LCD registers, in address order from 0xFF40.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LcdReg {
    Lcdc,
    Stat,
    Scy,
    Scx,
    Ly,
    Lyc,
    Dma,
    Bgp,
    Obp0,
    Obp1,
    Wy,
    Wx,
}

impl LcdReg {
    const ALL: [LcdReg; 12] = [
        LcdReg::Lcdc,
        LcdReg::Stat,
        LcdReg::Scy,
        LcdReg::Scx,
        LcdReg::Ly,
        LcdReg::Lyc,
        LcdReg::Dma,
        LcdReg::Bgp,
        LcdReg::Obp0,
        LcdReg::Obp1,
        LcdReg::Wy,
        LcdReg::Wx,
    ];

    fn at(address: u16) -> Option<LcdReg> {
        (REGS_LCDC_START..REGS_LCDC_END)
            .contains(&address)
            .then(|| LcdReg::ALL[usize::from(address - REGS_LCDC_START)])
    }
}

impl Register for LcdReg {
    const COUNT: usize = 12;

    fn index(self) -> usize {
        self as usize
    }
}

/// LCDC bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Lcdc {
    BgEnable = 0,
    ObjEnable = 1,
    /// Set for 8x16 sprites.
    ObjSize = 2,
    /// Set for the map at 0x9C00.
    BgTileMap = 3,
    /// Set for unsigned tile indices from 0x8000, clear for signed ones around 0x9000.
    TileData = 4,
    WindowEnable = 5,
    WindowTileMap = 6,
    LcdEnable = 7,
}

impl Bit for Lcdc {
    fn index(self) -> u8 {
        self as u8
    }
}

/// STAT bits. Bits 0 and 1 hold the mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Stat {
    Mode0 = 0,
    Mode1 = 1,
    LycEqLy = 2,
    IntMode0 = 3,
    IntMode1 = 4,
    IntMode2 = 5,
    IntLyc = 6,
}

impl Bit for Stat {
    fn index(self) -> u8 {
        self as u8
    }
}

/// Sprite attribute bits (fourth OAM byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SpriteAttr {
    Palette = 4,
    FlipH = 5,
    FlipV = 6,
    BehindBg = 7,
}

impl Bit for SpriteAttr {
    fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamSearch = 2,
    Transfer = 3,
}

impl Mode {
    /// STAT bit enabling the interrupt raised when this mode starts.
    fn interrupt_enable(self) -> Option<Stat> {
        match self {
            Mode::HBlank => Some(Stat::IntMode0),
            Mode::VBlank => Some(Stat::IntMode1),
            Mode::OamSearch => Some(Stat::IntMode2),
            Mode::Transfer => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct DmaCopy {
    source: u16,
    copied: u16,
}

pub struct LcdController {
    regs: RegisterFile<LcdReg>,
    video_ram: Ram,
    oam: Ram,
    /// `u64::MAX` while the display is off.
    next_non_idle_cycle: u64,
    /// Next row of the window to draw; advances only on lines showing it.
    window_row: u8,
    next_image: Option<image::Builder>,
    current_image: LcdImage,
    dma: Option<DmaCopy>,
    /// Interrupts raised since the last flush to the bus.
    raised: u8,
}

impl Default for LcdController {
    fn default() -> Self {
        Self::new()
    }
}

impl LcdController {
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            video_ram: Ram::new(VIDEO_RAM_SIZE),
            oam: Ram::new(OAM_RAM_SIZE),
            next_non_idle_cycle: u64::MAX,
            window_row: 0,
            next_image: None,
            current_image: LcdImage::blank(SCREEN_WIDTH, SCREEN_HEIGHT),
            dma: None,
            raised: 0,
        }
    }

    /// The last completed frame, or a blank one before the first.
    pub fn current_image(&self) -> &LcdImage {
        &self.current_image
    }

    pub fn mode(&self) -> Mode {
        match self.regs.get(LcdReg::Stat) & 0b11 {
            0 => Mode::HBlank,
            1 => Mode::VBlank,
            2 => Mode::OamSearch,
            _ => Mode::Transfer,
        }
    }

    pub fn ly(&self) -> u8 {
        self.regs.get(LcdReg::Ly)
    }

    pub fn is_on(&self) -> bool {
        self.regs.test_bit(LcdReg::Lcdc, Lcdc::LcdEnable)
    }

    pub fn is_dma_active(&self) -> bool {
        self.dma.is_some()
    }

    fn raise(&mut self, interrupt: Interrupt) {
        self.raised |= interrupt.mask();
    }

    fn flush_interrupts(&mut self, bus: &mut Bus<'_, '_>) {
        if self.raised == 0 {
            return;
        }
        for interrupt in Interrupt::ALL {
            if bits::test(self.raised, interrupt) {
                bus.request_interrupt(interrupt);
            }
        }
        self.raised = 0;
    }

    fn set_mode(&mut self, mode: Mode) {
        let stat = self.regs.get(LcdReg::Stat);
        self.regs.set(LcdReg::Stat, (stat & !0b11) | mode as u8);
        if let Some(enable) = mode.interrupt_enable() {
            if self.regs.test_bit(LcdReg::Stat, enable) {
                self.raise(Interrupt::LcdStat);
            }
        }
    }

    /// Writes LY or LYC and refreshes the coincidence flag.
    fn set_ly_lyc(&mut self, reg: LcdReg, value: u8) {
        debug_assert!(matches!(reg, LcdReg::Ly | LcdReg::Lyc));
        self.regs.set(reg, value);
        let equal = self.regs.get(LcdReg::Ly) == self.regs.get(LcdReg::Lyc);
        self.regs.set_bit(LcdReg::Stat, Stat::LycEqLy, equal);
        if equal && self.regs.test_bit(LcdReg::Stat, Stat::IntLyc) {
            self.raise(Interrupt::LcdStat);
        }
    }

    fn start_frame(&mut self) {
        self.next_image = Some(image::Builder::new(SCREEN_WIDTH, SCREEN_HEIGHT));
        self.window_row = 0;
        self.set_ly_lyc(LcdReg::Ly, 0);
        self.set_mode(Mode::OamSearch);
        self.next_non_idle_cycle += MODE2_CYCLES;
    }

    /// Makes the frame under construction current and raises VBLANK.
    fn publish_frame(&mut self) {
        if let Some(builder) = self.next_image.take() {
            self.current_image = builder.build();
        }
        self.raise(Interrupt::VBlank);
    }

    fn really_cycle(&mut self) {
        let ly = self.ly();
        match self.mode() {
            Mode::OamSearch => {
                self.set_mode(Mode::Transfer);
                let line = self.compute_line(ly);
                if let Some(builder) = self.next_image.as_mut() {
                    builder.set_line(usize::from(ly), line);
                }
                self.next_non_idle_cycle += MODE3_CYCLES;
            }
            Mode::Transfer => {
                self.set_mode(Mode::HBlank);
                if ly == LAST_VISIBLE_LINE {
                    self.publish_frame();
                }
                self.next_non_idle_cycle += MODE0_CYCLES;
            }
            Mode::HBlank if ly < LAST_VISIBLE_LINE => {
                self.set_ly_lyc(LcdReg::Ly, ly + 1);
                self.set_mode(Mode::OamSearch);
                self.next_non_idle_cycle += MODE2_CYCLES;
            }
            Mode::HBlank => {
                self.set_ly_lyc(LcdReg::Ly, ly + 1);
                self.set_mode(Mode::VBlank);
                self.next_non_idle_cycle += LINE_CYCLES;
            }
            Mode::VBlank if ly < LAST_LINE => {
                self.set_ly_lyc(LcdReg::Ly, ly + 1);
                self.next_non_idle_cycle += LINE_CYCLES;
            }
            Mode::VBlank => self.start_frame(),
        }
    }

    /// Copies one byte into OAM if a transfer is running.
    fn step_dma(&mut self, bus: &Bus<'_, '_>) {
        let Some(mut dma) = self.dma else {
            return;
        };
        let address = dma.source + dma.copied;
        let data = self.read(address).unwrap_or_else(|| bus.read(address));
        self.oam.write(usize::from(dma.copied), data);
        dma.copied += 1;
        if usize::from(dma.copied) == OAM_RAM_SIZE {
            log::trace!("OAM DMA from {:04X} done", dma.source);
            self.dma = None;
        } else {
            self.dma = Some(dma);
        }
    }

    fn write_register(&mut self, reg: LcdReg, data: u8) {
        match reg {
            LcdReg::Lcdc => {
                // Only an on-to-off write resets; while off the state is
                // already mode 0 at line 0 and no STAT interrupt repeats.
                let was_on = self.is_on();
                self.regs.set(LcdReg::Lcdc, data);
                if was_on && !self.is_on() {
                    log::debug!("LCD off");
                    self.set_mode(Mode::HBlank);
                    self.set_ly_lyc(LcdReg::Ly, 0);
                    self.next_non_idle_cycle = u64::MAX;
                }
            }
            LcdReg::Stat => {
                let stat = self.regs.get(LcdReg::Stat);
                self.regs.set(LcdReg::Stat, (data & !0b111) | (stat & 0b111));
            }
            LcdReg::Ly => log::warn!("ignored write of {data:#04X} to read-only LY"),
            LcdReg::Lyc => self.set_ly_lyc(LcdReg::Lyc, data),
            LcdReg::Dma => {
                self.regs.set(LcdReg::Dma, data);
                self.dma = Some(DmaCopy {
                    source: u16::from(data) << 8,
                    copied: 0,
                });
            }
            _ => self.regs.set(reg, data),
        }
    }
}

impl Clocked for LcdController {
    fn cycle(&mut self, cycle: u64, bus: &mut Bus<'_, '_>) -> Result<()> {
        self.step_dma(bus);
        if self.next_non_idle_cycle == u64::MAX && self.is_on() {
            log::debug!("LCD on at cycle {cycle}");
            self.next_non_idle_cycle = cycle;
            self.start_frame();
        } else if cycle >= self.next_non_idle_cycle {
            self.really_cycle();
        }
        self.flush_interrupts(bus);
        Ok(())
    }
}

impl Component for LcdController {
    fn read(&self, address: u16) -> Option<u8> {
        match address {
            VIDEO_RAM_START..VIDEO_RAM_END => {
                Some(self.video_ram.read(usize::from(address - VIDEO_RAM_START)))
            }
            OAM_START..OAM_END => Some(self.oam.read(usize::from(address - OAM_START))),
            _ => LcdReg::at(address).map(|reg| self.regs.get(reg)),
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        match address {
            VIDEO_RAM_START..VIDEO_RAM_END => {
                self.video_ram.write(usize::from(address - VIDEO_RAM_START), data)
            }
            OAM_START..OAM_END => self.oam.write(usize::from(address - OAM_START), data),
            _ => {
                if let Some(reg) = LcdReg::at(address) {
                    self.write_register(reg, data);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
