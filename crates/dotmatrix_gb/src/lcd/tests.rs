use super::*;
use crate::bus::InterruptSink;

const VISIBLE_CYCLES: u64 = LINE_CYCLES * SCREEN_HEIGHT as u64;

#[derive(Default)]
struct Requests(Vec<Interrupt>);

impl Component for Requests {
    fn read(&self, _address: u16) -> Option<u8> {
        None
    }

    fn write(&mut self, _address: u16, _data: u8) {}
}

impl InterruptSink for Requests {
    fn request_interrupt(&mut self, interrupt: Interrupt) {
        self.0.push(interrupt);
    }
}

impl Requests {
    fn count(&self, interrupt: Interrupt) -> usize {
        self.0.iter().filter(|&&i| i == interrupt).count()
    }
}

/// Page-addressable RAM standing in for the rest of the machine.
struct Memory(Vec<u8>);

impl Component for Memory {
    fn read(&self, address: u16) -> Option<u8> {
        Some(self.0[usize::from(address)])
    }

    fn write(&mut self, address: u16, data: u8) {
        self.0[usize::from(address)] = data;
    }
}

struct Harness {
    lcd: LcdController,
    memory: Memory,
    requests: Requests,
    cycle: u64,
}

impl Harness {
    fn new() -> Self {
        Self {
            lcd: LcdController::new(),
            memory: Memory(vec![0; 0x1_0000]),
            requests: Requests::default(),
            cycle: 0,
        }
    }

    /// Runs until (not including) `cycle`.
    fn run_until(&mut self, cycle: u64) {
        while self.cycle < cycle {
            let mut devices: [&mut dyn Component; 1] = [&mut self.memory];
            let mut bus = Bus::new(&mut devices).with_interrupts(&mut self.requests);
            self.lcd.cycle(self.cycle, &mut bus).unwrap();
            self.cycle += 1;
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        self.lcd.write(address, data);
    }
}

fn reg_address(reg: LcdReg) -> u16 {
    REGS_LCDC_START + reg as u16
}

fn set_reg(lcd: &mut LcdController, reg: LcdReg, value: u8) {
    lcd.write(reg_address(reg), value);
}

/// Fills all 8 rows of the tile at `address` with one colour.
fn solid_tile(lcd: &mut LcdController, address: u16, color: u8) {
    let lsb = if color & 1 != 0 { 0xFF } else { 0x00 };
    let msb = if color & 2 != 0 { 0xFF } else { 0x00 };
    for row in 0..8 {
        lcd.write(address + 2 * row, lsb);
        lcd.write(address + 2 * row + 1, msb);
    }
}

fn put_sprite(lcd: &mut LcdController, index: u16, y: u8, x: u8, tile: u8, attrs: u8) {
    let base = OAM_START + 4 * index;
    lcd.write(base, y);
    lcd.write(base + 1, x);
    lcd.write(base + 2, tile);
    lcd.write(base + 3, attrs);
}

fn colors(line: &LcdImageLine) -> Vec<u8> {
    (0..line.size()).map(|x| line.color(x)).collect()
}

/// LCD on, background and sprites on, everything at 0x8000, identity palettes.
fn sprite_setup() -> LcdController {
    let mut lcd = LcdController::new();
    set_reg(&mut lcd, LcdReg::Lcdc, 0x93);
    set_reg(&mut lcd, LcdReg::Bgp, 0xE4);
    set_reg(&mut lcd, LcdReg::Obp0, 0xE4);
    solid_tile(&mut lcd, 0x8010, 1);
    solid_tile(&mut lcd, 0x8020, 2);
    lcd
}

#[test]
fn display_off_never_produces_a_frame() {
    let mut h = Harness::new();
    h.run_until(2 * FRAME_CYCLES);
    assert!(h.lcd.next_image.is_none());
    assert_eq!(h.lcd.current_image(), &LcdImage::blank(SCREEN_WIDTH, SCREEN_HEIGHT));
    assert_eq!(h.lcd.ly(), 0);
    assert_eq!(h.lcd.mode(), Mode::HBlank);
    assert!(h.requests.0.is_empty());
}

#[test]
fn first_frame_is_published_within_one_frame_period() {
    let mut h = Harness::new();
    solid_tile(&mut h.lcd, 0x8000, 3);
    h.write(reg_address(LcdReg::Bgp), 0xE4);
    h.run_until(100);

    let enabled_at = h.cycle;
    let last_hblank = enabled_at + 143 * LINE_CYCLES + MODE2_CYCLES + MODE3_CYCLES;
    h.write(reg_address(LcdReg::Lcdc), 0x91);
    h.run_until(last_hblank);
    assert_eq!(h.lcd.current_image().get(0, 0), 0);
    assert_eq!(h.requests.count(Interrupt::VBlank), 0);

    // Published on entering mode 0 of the last visible line.
    h.run_until(last_hblank + 1);
    assert_eq!(h.lcd.current_image().get(0, 0), 3);
    assert_eq!((h.lcd.mode(), h.lcd.ly()), (Mode::HBlank, 143));
    assert_eq!(h.requests.count(Interrupt::VBlank), 1);

    h.run_until(enabled_at + VISIBLE_CYCLES + 1);
    assert_eq!((h.lcd.mode(), h.lcd.ly()), (Mode::VBlank, 144));

    h.run_until(enabled_at + FRAME_CYCLES);
    let image = h.lcd.current_image();
    assert!((0..SCREEN_HEIGHT).all(|y| (0..SCREEN_WIDTH).all(|x| image.get(x, y) == 3)));
    assert_eq!(h.requests.count(Interrupt::VBlank), 1);
}

#[test]
fn modes_follow_the_line_timing() {
    let mut h = Harness::new();
    h.write(reg_address(LcdReg::Lcdc), 0x80);

    h.run_until(1);
    assert_eq!((h.lcd.mode(), h.lcd.ly()), (Mode::OamSearch, 0));
    h.run_until(MODE2_CYCLES);
    assert_eq!(h.lcd.mode(), Mode::OamSearch);
    h.run_until(MODE2_CYCLES + 1);
    assert_eq!(h.lcd.mode(), Mode::Transfer);
    h.run_until(MODE2_CYCLES + MODE3_CYCLES + 1);
    assert_eq!(h.lcd.mode(), Mode::HBlank);
    h.run_until(LINE_CYCLES + 1);
    assert_eq!((h.lcd.mode(), h.lcd.ly()), (Mode::OamSearch, 1));

    h.run_until(153 * LINE_CYCLES + 1);
    assert_eq!((h.lcd.mode(), h.lcd.ly()), (Mode::VBlank, 153));
    h.run_until(FRAME_CYCLES + 1);
    assert_eq!((h.lcd.mode(), h.lcd.ly()), (Mode::OamSearch, 0));
    assert!(h.lcd.next_image.is_some());
}

#[test]
fn stat_interrupts_follow_enabled_modes() {
    let mut h = Harness::new();
    h.write(reg_address(LcdReg::Stat), 0x08);
    h.write(reg_address(LcdReg::Lcdc), 0x80);
    h.run_until(FRAME_CYCLES);
    // One mode 0 entry per visible line.
    assert_eq!(h.requests.count(Interrupt::LcdStat), SCREEN_HEIGHT);

    let mut h = Harness::new();
    h.write(reg_address(LcdReg::Stat), 0x30);
    h.write(reg_address(LcdReg::Lcdc), 0x80);
    h.run_until(FRAME_CYCLES);
    // Mode 2 on every visible line plus a single mode 1 entry.
    assert_eq!(h.requests.count(Interrupt::LcdStat), SCREEN_HEIGHT + 1);
}

#[test]
fn vblank_stat_interrupt_fires_once_per_frame() {
    let mut h = Harness::new();
    h.write(reg_address(LcdReg::Stat), 0x10);
    h.write(reg_address(LcdReg::Lcdc), 0x80);
    h.run_until(VISIBLE_CYCLES);
    assert_eq!(h.requests.count(Interrupt::LcdStat), 0);
    h.run_until(VISIBLE_CYCLES + 1);
    assert_eq!(h.requests.count(Interrupt::LcdStat), 1);
    // Later vertical-blank lines do not raise it again.
    h.run_until(FRAME_CYCLES);
    assert_eq!(h.requests.count(Interrupt::LcdStat), 1);
    h.run_until(FRAME_CYCLES + VISIBLE_CYCLES + 1);
    assert_eq!(h.requests.count(Interrupt::LcdStat), 2);
}

#[test]
fn clearing_lcdc_while_off_changes_nothing() {
    let mut h = Harness::new();
    h.write(reg_address(LcdReg::Stat), 0x08);
    h.write(reg_address(LcdReg::Lcdc), 0x00);
    h.write(reg_address(LcdReg::Lcdc), 0x11);
    h.run_until(10);
    assert!(h.requests.0.is_empty());
    assert_eq!((h.lcd.mode(), h.lcd.ly()), (Mode::HBlank, 0));
    assert_eq!(h.lcd.next_non_idle_cycle, u64::MAX);
}

#[test]
fn stat_writes_keep_mode_and_coincidence_bits() {
    let mut lcd = LcdController::new();
    set_reg(&mut lcd, LcdReg::Lyc, 0);
    assert!(lcd.regs.test_bit(LcdReg::Stat, Stat::LycEqLy));
    set_reg(&mut lcd, LcdReg::Stat, 0xFF);
    assert_eq!(lcd.read(reg_address(LcdReg::Stat)), Some(0xF8 | 0b100));
    set_reg(&mut lcd, LcdReg::Ly, 42);
    assert_eq!(lcd.ly(), 0);
}

#[test]
fn line_compare_interrupt() {
    let mut h = Harness::new();
    h.write(reg_address(LcdReg::Stat), 0x40);
    h.write(reg_address(LcdReg::Lyc), 5);
    h.write(reg_address(LcdReg::Lcdc), 0x80);

    h.run_until(5 * LINE_CYCLES);
    assert_eq!(h.requests.count(Interrupt::LcdStat), 0);
    assert!(!h.lcd.regs.test_bit(LcdReg::Stat, Stat::LycEqLy));

    h.run_until(5 * LINE_CYCLES + 1);
    assert_eq!(h.lcd.ly(), 5);
    assert!(h.lcd.regs.test_bit(LcdReg::Stat, Stat::LycEqLy));
    assert_eq!(h.requests.count(Interrupt::LcdStat), 1);

    h.run_until(6 * LINE_CYCLES + 1);
    assert!(!h.lcd.regs.test_bit(LcdReg::Stat, Stat::LycEqLy));
    assert_eq!(h.requests.count(Interrupt::LcdStat), 1);
}

#[test]
fn turning_the_display_off_resets_and_suspends() {
    let mut h = Harness::new();
    h.write(reg_address(LcdReg::Stat), 0x08);
    h.write(reg_address(LcdReg::Lcdc), 0x80);
    h.run_until(10 * LINE_CYCLES + 30);
    assert_eq!(h.lcd.ly(), 10);
    let before = h.requests.count(Interrupt::LcdStat);

    h.write(reg_address(LcdReg::Lcdc), 0x00);
    assert_eq!(h.lcd.mode(), Mode::HBlank);
    assert_eq!(h.lcd.ly(), 0);
    assert_eq!(h.lcd.next_non_idle_cycle, u64::MAX);

    h.run_until(h.cycle + 3 * FRAME_CYCLES);
    assert_eq!(h.lcd.ly(), 0);
    assert_eq!(h.lcd.mode(), Mode::HBlank);
    assert_eq!(h.requests.count(Interrupt::LcdStat), before + 1);

    // Back on: a new frame starts at line 0.
    h.write(reg_address(LcdReg::Lcdc), 0x80);
    let on = h.cycle;
    h.run_until(on + 1);
    assert_eq!((h.lcd.mode(), h.lcd.ly()), (Mode::OamSearch, 0));
    h.run_until(on + LINE_CYCLES + 1);
    assert_eq!(h.lcd.ly(), 1);
}

#[test]
fn dma_copies_one_byte_per_cycle() {
    let mut h = Harness::new();
    for i in 0..0xA0 {
        h.memory.0[0xC000 + i] = i as u8 ^ 0x5A;
    }
    h.write(reg_address(LcdReg::Dma), 0xC0);
    assert!(h.lcd.is_dma_active());
    assert_eq!(h.lcd.read(reg_address(LcdReg::Dma)), Some(0xC0));

    h.run_until(159);
    assert!(h.lcd.is_dma_active());
    assert_eq!(h.lcd.read(OAM_START + 158), Some(158 ^ 0x5A));
    assert_eq!(h.lcd.read(OAM_START + 159), Some(0));

    h.run_until(160);
    assert!(!h.lcd.is_dma_active());
    for i in 0..0xA0u16 {
        assert_eq!(h.lcd.read(OAM_START + i), Some(i as u8 ^ 0x5A));
    }
}

#[test]
fn dma_can_read_video_ram() {
    let mut h = Harness::new();
    h.write(0x8000, 0x77);
    h.write(reg_address(LcdReg::Dma), 0x80);
    h.run_until(1);
    assert_eq!(h.lcd.read(OAM_START), Some(0x77));
}

#[test]
fn bus_contract() {
    let mut lcd = LcdController::new();
    assert_eq!(lcd.read(0x7FFF), None);
    assert_eq!(lcd.read(0xA000), None);
    assert_eq!(lcd.read(OAM_END), None);
    assert_eq!(lcd.read(REGS_LCDC_END), None);
    lcd.write(0x9FFF, 1);
    lcd.write(0xFE9F, 2);
    lcd.write(reg_address(LcdReg::Wx), 3);
    assert_eq!(lcd.read(0x9FFF), Some(1));
    assert_eq!(lcd.read(0xFE9F), Some(2));
    assert_eq!(lcd.read(0xFF4B), Some(3));
}

/// Colour of background pixel `(x, ly)` computed straight from VRAM bytes.
fn reference_background_pixel(lcd: &LcdController, x: usize, ly: usize) -> u8 {
    let vram = |address: usize| lcd.read(address as u16).unwrap_or(0);
    let scx = usize::from(lcd.regs.get(LcdReg::Scx));
    let scy = usize::from(lcd.regs.get(LcdReg::Scy));
    let bgp = lcd.regs.get(LcdReg::Bgp);
    let bx = (x + scx) % 256;
    let by = (ly + scy) % 256;
    let tile = vram(0x9800 + (by / 8) * 32 + bx / 8);
    let row = 0x8000 + usize::from(tile) * 16 + (by % 8) * 2;
    let bit = 7 - bx % 8;
    let color = ((vram(row + 1) >> bit) & 1) << 1 | ((vram(row) >> bit) & 1);
    (bgp >> (2 * color)) & 0b11
}

#[test]
fn background_line_matches_tile_data() {
    let mut lcd = LcdController::new();
    for i in 0..0x1000u16 {
        lcd.write(0x8000 + i, (i.wrapping_mul(7) + 3) as u8);
    }
    for i in 0..0x400u16 {
        lcd.write(0x9800 + i, i.wrapping_mul(13) as u8);
    }
    set_reg(&mut lcd, LcdReg::Lcdc, 0x91);
    set_reg(&mut lcd, LcdReg::Scx, 37);
    set_reg(&mut lcd, LcdReg::Scy, 100);
    set_reg(&mut lcd, LcdReg::Bgp, 0x1B);

    for ly in 0..SCREEN_HEIGHT {
        let line = lcd.compute_line(ly as u8);
        assert_eq!(line.size(), SCREEN_WIDTH);
        for x in 0..SCREEN_WIDTH {
            assert_eq!(
                line.color(x),
                reference_background_pixel(&lcd, x, ly),
                "pixel ({x}, {ly})"
            );
        }
    }
}

#[test]
fn signed_tile_addressing() {
    let mut lcd = LcdController::new();
    set_reg(&mut lcd, LcdReg::Lcdc, 0x81);
    set_reg(&mut lcd, LcdReg::Bgp, 0xE4);
    solid_tile(&mut lcd, 0x8800, 3);
    solid_tile(&mut lcd, 0x9000, 1);
    lcd.write(0x9800, 0x80);
    let line = lcd.compute_line(0);
    assert_eq!(&colors(&line)[..10], &[3, 3, 3, 3, 3, 3, 3, 3, 1, 1]);
}

#[test]
fn background_disabled_is_blank() {
    let mut lcd = LcdController::new();
    solid_tile(&mut lcd, 0x8000, 3);
    set_reg(&mut lcd, LcdReg::Lcdc, 0x90);
    set_reg(&mut lcd, LcdReg::Bgp, 0xE4);
    assert!(colors(&lcd.compute_line(0)).iter().all(|&c| c == 0));
}

#[test]
fn window_is_spliced_at_wx_minus_7() {
    let mut lcd = LcdController::new();
    // Window map at 0x9C00 uses tile 1, whose first row only is colour 3.
    lcd.write(0x8010, 0xFF);
    lcd.write(0x8011, 0xFF);
    for i in 0..0x400 {
        lcd.write(0x9C00 + i, 1);
    }
    set_reg(&mut lcd, LcdReg::Lcdc, 0xF1);
    set_reg(&mut lcd, LcdReg::Bgp, 0xE4);
    set_reg(&mut lcd, LcdReg::Wx, 7 + 80);
    set_reg(&mut lcd, LcdReg::Wy, 10);

    for ly in 0..10 {
        assert!(colors(&lcd.compute_line(ly)).iter().all(|&c| c == 0), "line {ly}");
    }
    assert_eq!(lcd.window_row, 0);

    let line = colors(&lcd.compute_line(10));
    assert!(line[..80].iter().all(|&c| c == 0));
    assert!(line[80..].iter().all(|&c| c == 3));
    assert_eq!(lcd.window_row, 1);

    // Second window row is blank.
    assert!(colors(&lcd.compute_line(11)).iter().all(|&c| c == 0));
    assert_eq!(lcd.window_row, 2);
}

#[test]
fn window_off_screen_is_not_drawn() {
    let mut lcd = LcdController::new();
    solid_tile(&mut lcd, 0x8010, 3);
    for i in 0..0x400 {
        lcd.write(0x9C00 + i, 1);
    }
    set_reg(&mut lcd, LcdReg::Lcdc, 0xF1);
    set_reg(&mut lcd, LcdReg::Wx, 7 + 160);
    assert!(colors(&lcd.compute_line(0)).iter().all(|&c| c == 0));
    assert_eq!(lcd.window_row, 0);
}

#[test]
fn lower_x_then_lower_index_wins() {
    let mut lcd = sprite_setup();
    // Sprite 0 at screen x 12 (colour 2), sprite 1 at screen x 8 (colour 1).
    put_sprite(&mut lcd, 0, 16, 20, 2, 0);
    put_sprite(&mut lcd, 1, 16, 16, 1, 0);
    let line = colors(&lcd.compute_line(0));
    assert!(line[..8].iter().all(|&c| c == 0));
    assert!(line[8..16].iter().all(|&c| c == 1));
    assert!(line[16..20].iter().all(|&c| c == 2));
    assert!(line[20..].iter().all(|&c| c == 0));

    // Same X: the lower OAM index is on top.
    put_sprite(&mut lcd, 1, 16, 20, 1, 0);
    let line = colors(&lcd.compute_line(0));
    assert!(line[12..20].iter().all(|&c| c == 2));
}

#[test]
fn at_most_ten_sprites_per_line() {
    let mut lcd = sprite_setup();
    for i in 0..11u16 {
        put_sprite(&mut lcd, i, 16, 8 + 8 * i as u8, 1, 0);
    }
    assert_eq!(lcd.sprites_intersecting_line(0).len(), 10);
    let line = colors(&lcd.compute_line(0));
    assert!(line[..80].iter().all(|&c| c == 1));
    assert!(line[80..].iter().all(|&c| c == 0));
}

#[test]
fn sprite_behind_background_shows_through_colour_zero() {
    let mut lcd = sprite_setup();
    // Background tile 3: left half colour 2, right half colour 0.
    for row in 0..8 {
        lcd.write(0x8030 + 2 * row + 1, 0xF0);
    }
    lcd.write(0x9800, 3);
    put_sprite(&mut lcd, 0, 16, 8, 1, 0x80);
    let line = colors(&lcd.compute_line(0));
    assert_eq!(&line[..10], &[2, 2, 2, 2, 1, 1, 1, 1, 0, 0]);

    put_sprite(&mut lcd, 0, 16, 8, 1, 0x00);
    let line = colors(&lcd.compute_line(0));
    assert_eq!(&line[..10], &[1, 1, 1, 1, 1, 1, 1, 1, 0, 0]);
}

#[test]
fn front_sprite_colour_zero_is_transparent() {
    let mut lcd = sprite_setup();
    solid_tile(&mut lcd, 0x8000, 2);
    // Tile 4: only the leftmost pixel of each row is set.
    for row in 0..8 {
        lcd.write(0x8040 + 2 * row, 0x80);
    }
    put_sprite(&mut lcd, 0, 16, 8, 4, 0);
    let line = colors(&lcd.compute_line(0));
    assert_eq!(&line[..4], &[1, 2, 2, 2]);
}

#[test]
fn sprite_flips_and_palettes() {
    let mut lcd = sprite_setup();
    // Tile 4, row 0 only: leftmost pixel colour 3.
    lcd.write(0x8040, 0x80);
    lcd.write(0x8041, 0x80);
    put_sprite(&mut lcd, 0, 16, 8, 4, 0);
    assert_eq!(lcd.compute_line(0).color(0), 3);
    assert_eq!(lcd.compute_line(7).color(0), 0);

    put_sprite(&mut lcd, 0, 16, 8, 4, 0x20);
    let line = lcd.compute_line(0);
    assert_eq!((line.color(0), line.color(7)), (0, 3));

    put_sprite(&mut lcd, 0, 16, 8, 4, 0x40);
    assert_eq!(lcd.compute_line(0).color(0), 0);
    assert_eq!(lcd.compute_line(7).color(0), 3);

    set_reg(&mut lcd, LcdReg::Obp1, 0b01_00_00_00);
    put_sprite(&mut lcd, 0, 16, 8, 4, 0x10);
    assert_eq!(lcd.compute_line(0).color(0), 1);
}

#[test]
fn tall_sprites_use_an_even_tile_pair() {
    let mut lcd = sprite_setup();
    set_reg(&mut lcd, LcdReg::Lcdc, 0x97);
    solid_tile(&mut lcd, 0x8060, 1);
    solid_tile(&mut lcd, 0x8070, 2);
    put_sprite(&mut lcd, 0, 16, 8, 7, 0);
    assert_eq!(lcd.compute_line(0).color(0), 1);
    assert_eq!(lcd.compute_line(7).color(0), 1);
    assert_eq!(lcd.compute_line(8).color(0), 2);
    assert_eq!(lcd.compute_line(15).color(0), 2);
    assert_eq!(lcd.compute_line(16).color(0), 0);

    put_sprite(&mut lcd, 0, 16, 8, 7, 0x40);
    assert_eq!(lcd.compute_line(0).color(0), 2);
    assert_eq!(lcd.compute_line(15).color(0), 1);
}

#[test]
fn sprites_partially_off_the_left_edge() {
    let mut lcd = sprite_setup();
    put_sprite(&mut lcd, 0, 16, 4, 1, 0);
    let line = colors(&lcd.compute_line(0));
    assert_eq!(&line[..6], &[1, 1, 1, 1, 0, 0]);
}

#[test]
fn vertically_off_screen_sprites_never_appear() {
    for lcdc in [0x93u8, 0x97] {
        for y in [0u8, 160, 200, 255] {
            let mut lcd = sprite_setup();
            set_reg(&mut lcd, LcdReg::Lcdc, lcdc);
            solid_tile(&mut lcd, 0x8030, 3);
            let without: Vec<LcdImageLine> =
                (0..SCREEN_HEIGHT).map(|ly| lcd.compute_line(ly as u8)).collect();

            put_sprite(&mut lcd, 0, y, 80, 3, 0);
            for (ly, expected) in without.iter().enumerate() {
                assert!(lcd.sprites_intersecting_line(ly as u8).is_empty());
                assert_eq!(&lcd.compute_line(ly as u8), expected, "y={y} line {ly}");
            }
        }
    }
}
