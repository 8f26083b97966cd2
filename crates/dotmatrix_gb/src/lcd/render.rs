use super::image_line::{self, LcdImageLine};
use super::{Lcdc, LcdController, LcdReg, SpriteAttr};
use crate::address_map::VIDEO_RAM_START;
use crate::bits;
use crate::SCREEN_WIDTH;

/// Side of the background and window maps, in pixels.
const BG_SIZE: usize = 256;
const TILES_PER_ROW: usize = BG_SIZE / 8;
const TILE_BYTES: u16 = 16;
const SPRITE_COUNT: usize = 40;
const MAX_SPRITES_PER_LINE: usize = 10;
/// OAM stores sprite positions offset by these amounts.
const SPRITE_Y_OFFSET: i32 = 16;
const SPRITE_X_OFFSET: isize = 8;
const WINDOW_X_OFFSET: i32 = 7;

impl LcdController {
    /// Composes background, window and sprites for line `ly`.
    pub(super) fn compute_line(&mut self, ly: u8) -> LcdImageLine {
        let background = if self.lcdc(Lcdc::BgEnable) {
            self.background_line(ly)
        } else {
            LcdImageLine::blank(SCREEN_WIDTH)
        };

        let wx = i32::from(self.regs.get(LcdReg::Wx)) - WINDOW_X_OFFSET;
        let window_visible = self.lcdc(Lcdc::WindowEnable)
            && (0..SCREEN_WIDTH as i32).contains(&wx)
            && ly >= self.regs.get(LcdReg::Wy);
        let bg_win = if window_visible {
            let window = self.window_line(wx as usize);
            background.join(&window, wx as usize)
        } else {
            background
        };

        if !self.lcdc(Lcdc::ObjEnable) {
            return bg_win;
        }

        let sprites = self.sprites_intersecting_line(ly);
        let back = self.sprite_layer(&sprites, ly, true);
        let front = self.sprite_layer(&sprites, ly, false);
        // Back sprites only show through background colour 0.
        let opacity = bg_win.opacity().or(&!back.opacity());
        back.below_with_opacity(&bg_win, &opacity).below(&front)
    }

    fn lcdc(&self, bit: Lcdc) -> bool {
        self.regs.test_bit(LcdReg::Lcdc, bit)
    }

    fn vram(&self, address: u16) -> u8 {
        self.video_ram.read(usize::from(address - VIDEO_RAM_START))
    }

    fn background_line(&self, ly: u8) -> LcdImageLine {
        let row = ly.wrapping_add(self.regs.get(LcdReg::Scy));
        self.tile_line(Lcdc::BgTileMap, row)
            .extract_wrapped(SCREEN_WIDTH, isize::from(self.regs.get(LcdReg::Scx)))
            .map_colors(self.regs.get(LcdReg::Bgp))
    }

    fn window_line(&mut self, wx: usize) -> LcdImageLine {
        let row = self.window_row;
        self.window_row = self.window_row.wrapping_add(1);
        self.tile_line(Lcdc::WindowTileMap, row)
            .extract_zero_extended(SCREEN_WIDTH, 0)
            .shift(wx as isize)
            .map_colors(self.regs.get(LcdReg::Bgp))
    }

    /// Row `row` of the 256-pixel map selected by `map_bit`, unmapped colours.
    fn tile_line(&self, map_bit: Lcdc, row: u8) -> LcdImageLine {
        let map_base: u16 = if self.lcdc(map_bit) { 0x9C00 } else { 0x9800 };
        let first_tile = map_base + u16::from(row / 8) * TILES_PER_ROW as u16;
        let mut builder = image_line::Builder::new(BG_SIZE);
        for x in 0..TILES_PER_ROW {
            let tile = self.vram(first_tile + x as u16);
            let address = self.tile_address(tile) + 2 * u16::from(row % 8);
            builder.set_bytes(
                x,
                self.vram(address + 1).reverse_bits(),
                self.vram(address).reverse_bits(),
            );
        }
        builder.build()
    }

    fn tile_address(&self, tile: u8) -> u16 {
        if self.lcdc(Lcdc::TileData) {
            0x8000 + u16::from(tile) * TILE_BYTES
        } else {
            0x9000u16.wrapping_add((i16::from(tile as i8) * TILE_BYTES as i16) as u16)
        }
    }

    fn sprite_height(&self) -> i32 {
        if self.lcdc(Lcdc::ObjSize) {
            16
        } else {
            8
        }
    }

    fn sprite_byte(&self, index: usize, field: usize) -> u8 {
        self.oam.read(4 * index + field)
    }

    /// First ten sprites in OAM order covering `ly`, sorted by X then index.
    pub(super) fn sprites_intersecting_line(&self, ly: u8) -> Vec<usize> {
        let height = self.sprite_height();
        let line = i32::from(ly);
        let mut found: Vec<(u8, usize)> = (0..SPRITE_COUNT)
            .filter(|&i| {
                let top = i32::from(self.sprite_byte(i, 0)) - SPRITE_Y_OFFSET;
                (top..top + height).contains(&line)
            })
            .take(MAX_SPRITES_PER_LINE)
            .map(|i| (self.sprite_byte(i, 1), i))
            .collect();
        found.sort_unstable();
        found.into_iter().map(|(_, i)| i).collect()
    }

    /// Sprites with the given priority, earlier ones drawn on top.
    fn sprite_layer(&self, sprites: &[usize], ly: u8, behind_bg: bool) -> LcdImageLine {
        sprites
            .iter()
            .filter(|&&i| bits::test(self.sprite_byte(i, 3), SpriteAttr::BehindBg) == behind_bg)
            .fold(LcdImageLine::blank(SCREEN_WIDTH), |layer, &i| {
                self.sprite_line(i, ly).below(&layer)
            })
    }

    fn sprite_line(&self, index: usize, ly: u8) -> LcdImageLine {
        let top = i32::from(self.sprite_byte(index, 0)) - SPRITE_Y_OFFSET;
        let x = isize::from(self.sprite_byte(index, 1)) - SPRITE_X_OFFSET;
        let attrs = self.sprite_byte(index, 3);
        let height = self.sprite_height();

        let mut tile = self.sprite_byte(index, 2);
        if height == 16 {
            tile &= 0xFE;
        }
        let mut row = i32::from(ly) - top;
        if bits::test(attrs, SpriteAttr::FlipV) {
            row = height - 1 - row;
        }
        let address = 0x8000 + u16::from(tile) * TILE_BYTES + 2 * row as u16;
        let (mut msb, mut lsb) = (self.vram(address + 1), self.vram(address));
        if !bits::test(attrs, SpriteAttr::FlipH) {
            msb = msb.reverse_bits();
            lsb = lsb.reverse_bits();
        }

        let mut builder = image_line::Builder::new(SCREEN_WIDTH);
        builder.set_bytes(0, msb, lsb);
        let palette = if bits::test(attrs, SpriteAttr::Palette) {
            LcdReg::Obp1
        } else {
            LcdReg::Obp0
        };
        builder.build().shift(x).map_colors(self.regs.get(palette))
    }
}
