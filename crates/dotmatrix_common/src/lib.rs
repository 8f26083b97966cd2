pub mod key;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::new_rgb(0, 0, 0);
    pub const WHITE: Color = Color::new_rgb(255, 255, 255);

    /// The four shades of the DMG monochrome panel, indexed by 2-bit colour.
    pub const DMG_SHADES: [Color; 4] = [
        Color::WHITE,
        Color::new_rgb(0xAA, 0xAA, 0xAA),
        Color::new_rgb(0x55, 0x55, 0x55),
        Color::BLACK,
    ];

    #[inline]
    pub const fn new_rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 0xff }
    }

    #[inline]
    pub const fn new_rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    /// Shade for a 2-bit DMG colour index. Only the low two bits are used.
    #[inline]
    pub const fn dmg_shade(index: u8) -> Color {
        Color::DMG_SHADES[(index & 0b11) as usize]
    }

    #[inline]
    pub const fn rgb(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }
}
