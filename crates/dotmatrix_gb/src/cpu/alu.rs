//! Pure arithmetic/logic unit.
//!
//! Every operation returns its result together with the Z/N/H/C flags it
//! produced; the processor decides which of those flags reach F.

use bitflags::bitflags;

bitflags! {
    /// Condition flags, at their hardware positions in the F register.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        const Z = 0x80;
        const N = 0x40;
        const H = 0x20;
        const C = 0x10;
    }
}

impl Flags {
    pub const fn znhc(z: bool, n: bool, h: bool, c: bool) -> Flags {
        let mut bits = 0;
        if z {
            bits |= Flags::Z.bits();
        }
        if n {
            bits |= Flags::N.bits();
        }
        if h {
            bits |= Flags::H.bits();
        }
        if c {
            bits |= Flags::C.bits();
        }
        Flags::from_bits_retain(bits)
    }
}

/// Result of an ALU operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueFlags<T = u8> {
    pub value: T,
    pub flags: Flags,
}

impl<T: Into<u32>> ValueFlags<T> {
    /// Packs as `value << 8 | flags`, the layout of an AF-style pair.
    pub fn pack(self) -> u32 {
        (self.value.into() << 8) | u32::from(self.flags.bits())
    }
}

pub fn unpack_value(packed: u32) -> u32 {
    packed >> 8
}

pub fn unpack_flags(packed: u32) -> Flags {
    Flags::from_bits_truncate(packed as u8)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotDir {
    Left,
    Right,
}

#[inline]
fn with_flags(value: u8, n: bool, h: bool, c: bool) -> ValueFlags {
    ValueFlags {
        value,
        flags: Flags::znhc(value == 0, n, h, c),
    }
}

pub fn add(l: u8, r: u8, carry_in: bool) -> ValueFlags {
    let c0 = u8::from(carry_in);
    let sum = u16::from(l) + u16::from(r) + u16::from(c0);
    let h = (l & 0xF) + (r & 0xF) + c0 > 0xF;
    with_flags(sum as u8, false, h, sum > 0xFF)
}

/// 16-bit addition reporting the flags of the low byte (H from bit 3,
/// C from bit 7). Z is always clear.
pub fn add16_low(l: u16, r: u16) -> ValueFlags<u16> {
    let (low, high) = add16(l, r);
    ValueFlags {
        value: u16::from_be_bytes([high.value, low.value]),
        flags: low.flags - Flags::Z,
    }
}

/// 16-bit addition reporting the flags of the high byte (H from bit 11,
/// C from bit 15). Z is always clear.
pub fn add16_high(l: u16, r: u16) -> ValueFlags<u16> {
    let (low, high) = add16(l, r);
    ValueFlags {
        value: u16::from_be_bytes([high.value, low.value]),
        flags: high.flags - Flags::Z,
    }
}

fn add16(l: u16, r: u16) -> (ValueFlags, ValueFlags) {
    let [lh, ll] = l.to_be_bytes();
    let [rh, rl] = r.to_be_bytes();
    let low = add(ll, rl, false);
    let high = add(lh, rh, low.flags.contains(Flags::C));
    (low, high)
}

pub fn sub(l: u8, r: u8, borrow_in: bool) -> ValueFlags {
    let b0 = i16::from(borrow_in);
    let h = i16::from(l & 0xF) - i16::from(r & 0xF) - b0 < 0;
    let c = i16::from(l) - i16::from(r) - b0 < 0;
    with_flags(l.wrapping_sub(r).wrapping_sub(b0 as u8), true, h, c)
}

/// Decimal adjustment of `v` given the N/H/C flags of the preceding
/// addition or subtraction.
pub fn bcd_adjust(v: u8, n: bool, h: bool, c: bool) -> ValueFlags {
    let fix_low = h || (!n && (v & 0xF) > 9);
    let fix_high = c || (!n && v > 0x99);
    let fix = 0x60 * u8::from(fix_high) + 0x06 * u8::from(fix_low);
    let value = if n { v.wrapping_sub(fix) } else { v.wrapping_add(fix) };
    with_flags(value, n, false, fix_high)
}

pub fn and(l: u8, r: u8) -> ValueFlags {
    with_flags(l & r, false, true, false)
}

pub fn or(l: u8, r: u8) -> ValueFlags {
    with_flags(l | r, false, false, false)
}

pub fn xor(l: u8, r: u8) -> ValueFlags {
    with_flags(l ^ r, false, false, false)
}

pub fn shift_left(v: u8) -> ValueFlags {
    with_flags(v << 1, false, false, v & 0x80 != 0)
}

/// Shift right keeping the sign bit.
pub fn shift_right_arithmetic(v: u8) -> ValueFlags {
    with_flags(((v as i8) >> 1) as u8, false, false, v & 1 != 0)
}

pub fn shift_right_logical(v: u8) -> ValueFlags {
    with_flags(v >> 1, false, false, v & 1 != 0)
}

/// 8-bit rotation; C receives the bit that wrapped around.
pub fn rotate(dir: RotDir, v: u8) -> ValueFlags {
    match dir {
        RotDir::Left => with_flags(v.rotate_left(1), false, false, v & 0x80 != 0),
        RotDir::Right => with_flags(v.rotate_right(1), false, false, v & 1 != 0),
    }
}

/// 9-bit rotation through the carry flag.
pub fn rotate_through_carry(dir: RotDir, v: u8, carry: bool) -> ValueFlags {
    let c = u8::from(carry);
    match dir {
        RotDir::Left => with_flags((v << 1) | c, false, false, v & 0x80 != 0),
        RotDir::Right => with_flags((v >> 1) | (c << 7), false, false, v & 1 != 0),
    }
}

pub fn swap(v: u8) -> ValueFlags {
    with_flags(v.rotate_left(4), false, false, false)
}

/// Z is set when bit `index` of `v` is clear. The value is always 0.
pub fn test_bit(v: u8, index: u8) -> ValueFlags {
    assert!(index < 8, "bit index {index} out of range");
    ValueFlags {
        value: 0,
        flags: Flags::znhc(v & (1 << index) == 0, false, true, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_matches_wrapping_addition_and_flags() {
        for l in 0..=255u8 {
            for r in 0..=255u8 {
                let result = add(l, r, false);
                assert_eq!(result.value, l.wrapping_add(r));
                assert_eq!(result.flags.contains(Flags::Z), result.value == 0);
                assert!(!result.flags.contains(Flags::N));
                let packed = result.pack();
                assert_eq!(unpack_value(packed), u32::from(l.wrapping_add(r)));
                assert_eq!(unpack_flags(packed), result.flags);

                let with_carry = add(l, r, true);
                assert_eq!(
                    with_carry.flags.contains(Flags::C),
                    u16::from(l) + u16::from(r) + 1 > 255
                );
            }
        }
    }

    #[test]
    fn add_half_carry() {
        let result = add(0x0F, 0x01, false);
        assert_eq!(result.value, 0x10);
        assert_eq!(result.flags, Flags::H);
        assert_eq!(add(0x80, 0x80, false).flags, Flags::Z | Flags::C);
        assert_eq!(add(0x0E, 0x01, true).flags, Flags::H);
    }

    #[test]
    fn sub_flags() {
        assert_eq!(sub(0x10, 0x10, false).flags, Flags::Z | Flags::N);
        assert_eq!(sub(0x10, 0x01, false), ValueFlags { value: 0x0F, flags: Flags::N | Flags::H });
        assert_eq!(sub(0x00, 0x01, false).flags, Flags::N | Flags::H | Flags::C);
        assert_eq!(sub(0x01, 0x00, true).flags, Flags::Z | Flags::N);
        assert_eq!(sub(0x00, 0x00, true).value, 0xFF);
    }

    #[test]
    fn add16_low_and_high_keep_their_own_flags() {
        let low = add16_low(0x11FF, 0x0001);
        assert_eq!(low.value, 0x1200);
        assert_eq!(low.flags, Flags::H | Flags::C);

        let high = add16_high(0x11FF, 0x0001);
        assert_eq!(high.value, 0x1200);
        assert_eq!(high.flags, Flags::empty());

        let high = add16_high(0x8FFF, 0x8001);
        assert_eq!(high.value, 0x1000);
        assert_eq!(high.flags, Flags::H | Flags::C);
    }

    #[test]
    fn bcd_adjust_after_add_and_sub() {
        // 0x15 + 0x27 = 0x3C -> 42
        let sum = add(0x15, 0x27, false);
        let adjusted = bcd_adjust(sum.value, false, sum.flags.contains(Flags::H), false);
        assert_eq!(adjusted.value, 0x42);
        assert!(!adjusted.flags.contains(Flags::C));

        // 0x99 + 0x01 -> 00 with carry
        let sum = add(0x99, 0x01, false);
        let adjusted = bcd_adjust(sum.value, false, sum.flags.contains(Flags::H), false);
        assert_eq!(adjusted.value, 0x00);
        assert_eq!(adjusted.flags, Flags::Z | Flags::C);

        // 0x42 - 0x15 = 0x2D -> 27
        let diff = sub(0x42, 0x15, false);
        let adjusted = bcd_adjust(diff.value, true, diff.flags.contains(Flags::H), false);
        assert_eq!(adjusted.value, 0x27);
        assert_eq!(adjusted.flags, Flags::N);
    }

    #[test]
    fn logic_flags() {
        assert_eq!(and(0xF0, 0x0F).flags, Flags::Z | Flags::H);
        assert_eq!(or(0xF0, 0x0F).value, 0xFF);
        assert_eq!(or(0, 0).flags, Flags::Z);
        assert_eq!(xor(0xAA, 0xAA).flags, Flags::Z);
    }

    #[test]
    fn shifts() {
        assert_eq!(shift_left(0x81), ValueFlags { value: 0x02, flags: Flags::C });
        assert_eq!(shift_left(0x80).flags, Flags::Z | Flags::C);
        assert_eq!(shift_right_arithmetic(0x81), ValueFlags { value: 0xC0, flags: Flags::C });
        assert_eq!(shift_right_logical(0x81), ValueFlags { value: 0x40, flags: Flags::C });
        assert_eq!(shift_right_logical(0x01).flags, Flags::Z | Flags::C);
    }

    #[test]
    fn rotations() {
        assert_eq!(rotate(RotDir::Left, 0x81), ValueFlags { value: 0x03, flags: Flags::C });
        assert_eq!(rotate(RotDir::Right, 0x01), ValueFlags { value: 0x80, flags: Flags::C });
        assert_eq!(rotate(RotDir::Left, 0), ValueFlags { value: 0, flags: Flags::Z });

        assert_eq!(
            rotate_through_carry(RotDir::Left, 0x80, false),
            ValueFlags { value: 0x00, flags: Flags::Z | Flags::C }
        );
        assert_eq!(rotate_through_carry(RotDir::Left, 0x00, true).value, 0x01);
        assert_eq!(
            rotate_through_carry(RotDir::Right, 0x01, true),
            ValueFlags { value: 0x80, flags: Flags::C }
        );
    }

    #[test]
    fn swap_and_test_bit() {
        assert_eq!(swap(0xAB).value, 0xBA);
        assert_eq!(swap(0).flags, Flags::Z);
        assert_eq!(test_bit(0b1000, 3).flags, Flags::H);
        assert_eq!(test_bit(0b1000, 2).flags, Flags::Z | Flags::H);
    }
}
