use crate::bits::bit_vector::{self, BitVector};

/// Palette that maps every colour onto itself.
const IDENTITY_PALETTE: u8 = 0b11_10_01_00;

/// One row of pixels as two bit-planes plus an opacity mask.
///
/// The colour of pixel `x` is `msb[x] << 1 | lsb[x]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LcdImageLine {
    msb: BitVector,
    lsb: BitVector,
    opacity: BitVector,
}

impl LcdImageLine {
    pub fn new(msb: BitVector, lsb: BitVector, opacity: BitVector) -> Self {
        assert!(
            msb.size() == lsb.size() && lsb.size() == opacity.size(),
            "line planes must have the same size"
        );
        Self { msb, lsb, opacity }
    }

    /// A fully transparent line of colour 0.
    pub fn blank(size: usize) -> Self {
        let zero = BitVector::new(size);
        Self::new(zero.clone(), zero.clone(), zero)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.msb.size()
    }

    pub fn msb(&self) -> &BitVector {
        &self.msb
    }

    pub fn lsb(&self) -> &BitVector {
        &self.lsb
    }

    pub fn opacity(&self) -> &BitVector {
        &self.opacity
    }

    /// Colour index of pixel `x`.
    pub fn color(&self, x: usize) -> u8 {
        u8::from(self.msb.test_bit(x)) << 1 | u8::from(self.lsb.test_bit(x))
    }

    pub fn shift(&self, distance: isize) -> Self {
        self.map_planes(|v| v.shift(distance))
    }

    pub fn extract_wrapped(&self, size: usize, start: isize) -> Self {
        self.map_planes(|v| v.extract_wrapped(size, start))
    }

    pub fn extract_zero_extended(&self, size: usize, start: isize) -> Self {
        self.map_planes(|v| v.extract_zero_extended(size, start))
    }

    /// Replaces each colour `c` by bits `2c..2c+2` of `palette`. Opacity is
    /// left alone.
    pub fn map_colors(&self, palette: u8) -> Self {
        if palette == IDENTITY_PALETTE {
            return self.clone();
        }

        let not_msb = !&self.msb;
        let not_lsb = !&self.lsb;
        let masks = [
            not_msb.and(&not_lsb),
            not_msb.and(&self.lsb),
            self.msb.and(&not_lsb),
            self.msb.and(&self.lsb),
        ];

        let mut msb = BitVector::new(self.size());
        let mut lsb = BitVector::new(self.size());
        for (color, mask) in masks.iter().enumerate() {
            let mapped = (palette >> (2 * color)) & 0b11;
            if mapped & 0b10 != 0 {
                msb = msb.or(mask);
            }
            if mapped & 0b01 != 0 {
                lsb = lsb.or(mask);
            }
        }
        Self::new(msb, lsb, self.opacity.clone())
    }

    /// Composes `over` on top of this line, using `over`'s own opacity.
    pub fn below(&self, over: &LcdImageLine) -> Self {
        self.below_with_opacity(over, over.opacity())
    }

    /// Composes `over` on top of this line wherever `opacity` is set.
    pub fn below_with_opacity(&self, over: &LcdImageLine, opacity: &BitVector) -> Self {
        assert_eq!(self.size(), over.size(), "lines must have the same size");
        let transparent = !opacity;
        let pick = |top: &BitVector, bottom: &BitVector| top.and(opacity).or(&bottom.and(&transparent));
        Self::new(
            pick(&over.msb, &self.msb),
            pick(&over.lsb, &self.lsb),
            self.opacity.or(opacity),
        )
    }

    /// Pixels `[0, index)` from this line and `[index, size)` from `that`.
    pub fn join(&self, that: &LcdImageLine, index: usize) -> Self {
        assert_eq!(self.size(), that.size(), "lines must have the same size");
        assert!(index <= self.size(), "join index {index} out of range");
        let from_that = BitVector::filled(self.size(), true).shift(index as isize);
        let from_self = !&from_that;
        let splice = |a: &BitVector, b: &BitVector| a.and(&from_self).or(&b.and(&from_that));
        Self::new(
            splice(&self.msb, &that.msb),
            splice(&self.lsb, &that.lsb),
            splice(&self.opacity, &that.opacity),
        )
    }

    fn map_planes(&self, f: impl Fn(&BitVector) -> BitVector) -> Self {
        Self::new(f(&self.msb), f(&self.lsb), f(&self.opacity))
    }
}

/// Builds a line from tile bytes. Bit `i` of each byte is pixel `8 * index + i`,
/// so callers reverse tile bytes (whose bit 7 is the leftmost pixel) unless
/// the tile is flipped horizontally.
#[derive(Debug)]
pub struct Builder {
    msb: bit_vector::Builder,
    lsb: bit_vector::Builder,
}

impl Builder {
    pub fn new(size: usize) -> Self {
        Self {
            msb: bit_vector::Builder::new(size),
            lsb: bit_vector::Builder::new(size),
        }
    }

    pub fn set_bytes(&mut self, index: usize, msb: u8, lsb: u8) -> &mut Self {
        self.msb.set_byte(index, msb);
        self.lsb.set_byte(index, lsb);
        self
    }

    /// Opacity is derived as `msb | lsb`: colour 0 is transparent.
    pub fn build(self) -> LcdImageLine {
        let msb = self.msb.build();
        let lsb = self.lsb.build();
        let opacity = msb.or(&lsb);
        LcdImageLine::new(msb, lsb, opacity)
    }
}
