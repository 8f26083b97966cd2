//! Bit-level helpers shared by the register banks, the ALU and the LCD.

pub mod bit_vector;

pub use bit_vector::BitVector;

/// A named bit inside an 8-bit value.
///
/// Implemented by closed `#[repr(u8)]` enums whose discriminant is the bit
/// index (LCDC/STAT bits, sprite attributes, interrupt kinds, ...).
pub trait Bit: Copy {
    fn index(self) -> u8;

    #[inline]
    fn mask(self) -> u8 {
        1 << self.index()
    }
}

#[inline]
pub fn test<B: Bit>(value: u8, bit: B) -> bool {
    value & bit.mask() != 0
}

#[inline]
pub fn test_index(value: u8, index: u8) -> bool {
    debug_assert!(index < 8);
    (value >> index) & 1 != 0
}

#[inline]
pub fn set<B: Bit>(value: u8, bit: B, on: bool) -> u8 {
    if on {
        value | bit.mask()
    } else {
        value & !bit.mask()
    }
}

/// Extracts `len` bits of `value` starting at bit `start`.
#[inline]
pub fn extract(value: u8, start: u8, len: u8) -> u8 {
    debug_assert!(start + len <= 8);
    (value >> start) & ((1u16 << len) - 1) as u8
}
