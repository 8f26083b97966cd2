use std::fmt;
use std::ops::Not;

const WORD_BITS: usize = 32;

/// How bits outside `[0, size)` are produced by an extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Extension {
    Zero,
    Wrapped,
}

/// Immutable bit array whose size is a positive multiple of 32.
///
/// Bit `i` lives in word `i / 32`, at position `i % 32`. Bit 0 is the
/// leftmost pixel when a vector is used as a display line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitVector {
    words: Box<[u32]>,
}

fn check_size(size: usize) {
    assert!(
        size > 0 && size % WORD_BITS == 0,
        "bit vector size must be a positive multiple of 32, got {size}"
    );
}

impl BitVector {
    /// A vector of `size` zero bits.
    pub fn new(size: usize) -> Self {
        Self::filled(size, false)
    }

    pub fn filled(size: usize, value: bool) -> Self {
        check_size(size);
        let word = if value { u32::MAX } else { 0 };
        Self {
            words: vec![word; size / WORD_BITS].into_boxed_slice(),
        }
    }

    /// Builds a vector from little-endian words (word 0 holds bits 0..32).
    pub fn from_words(words: Vec<u32>) -> Self {
        assert!(!words.is_empty(), "bit vector needs at least one word");
        Self {
            words: words.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn test_bit(&self, index: usize) -> bool {
        assert!(
            index < self.size(),
            "bit index {index} out of range for size {}",
            self.size()
        );
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 != 0
    }

    pub fn and(&self, that: &BitVector) -> BitVector {
        self.zip_with(that, |a, b| a & b)
    }

    pub fn or(&self, that: &BitVector) -> BitVector {
        self.zip_with(that, |a, b| a | b)
    }

    /// Extracts `size` bits starting at `start`; bits outside this vector are 0.
    pub fn extract_zero_extended(&self, size: usize, start: isize) -> BitVector {
        self.extract(size, start, Extension::Zero)
    }

    /// Extracts `size` bits starting at `start`, treating this vector as
    /// infinitely repeated in both directions.
    pub fn extract_wrapped(&self, size: usize, start: isize) -> BitVector {
        self.extract(size, start, Extension::Wrapped)
    }

    /// Moves every bit `distance` positions towards higher indices (negative
    /// distances move towards lower ones). Vacated bits are 0.
    pub fn shift(&self, distance: isize) -> BitVector {
        self.extract_zero_extended(self.size(), -distance)
    }

    fn zip_with(&self, that: &BitVector, f: impl Fn(u32, u32) -> u32) -> BitVector {
        assert_eq!(
            self.size(),
            that.size(),
            "bit vector operands must have the same size"
        );
        let words = self
            .words
            .iter()
            .zip(that.words.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        BitVector { words }
    }

    fn extract(&self, size: usize, start: isize, extension: Extension) -> BitVector {
        check_size(size);
        let words = (0..size / WORD_BITS)
            .map(|i| self.extract_word(start + (i * WORD_BITS) as isize, extension))
            .collect();
        BitVector { words }
    }

    /// The 32 bits starting at bit `start`.
    fn extract_word(&self, start: isize, extension: Extension) -> u32 {
        let word = start.div_euclid(WORD_BITS as isize);
        let offset = start.rem_euclid(WORD_BITS as isize) as u32;
        let low = self.word_at(word, extension);
        if offset == 0 {
            low
        } else {
            let high = self.word_at(word + 1, extension);
            (low >> offset) | (high << (WORD_BITS as u32 - offset))
        }
    }

    fn word_at(&self, index: isize, extension: Extension) -> u32 {
        let len = self.words.len() as isize;
        match extension {
            Extension::Zero if (0..len).contains(&index) => self.words[index as usize],
            Extension::Zero => 0,
            Extension::Wrapped => self.words[index.rem_euclid(len) as usize],
        }
    }
}

impl Not for &BitVector {
    type Output = BitVector;

    fn not(self) -> BitVector {
        BitVector {
            words: self.words.iter().map(|w| !w).collect(),
        }
    }
}

impl Not for BitVector {
    type Output = BitVector;

    fn not(self) -> BitVector {
        !&self
    }
}

/// Most significant bit first, as the vector would be written on paper.
impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for word in self.words.iter().rev() {
            write!(f, "{word:032b}")?;
        }
        Ok(())
    }
}

/// Single-use builder filling a zeroed vector byte by byte.
#[derive(Debug)]
pub struct Builder {
    words: Vec<u32>,
}

impl Builder {
    pub fn new(size: usize) -> Self {
        check_size(size);
        Self {
            words: vec![0; size / WORD_BITS],
        }
    }

    /// Sets byte `index` (bits `8 * index .. 8 * index + 8`).
    pub fn set_byte(&mut self, index: usize, value: u8) -> &mut Self {
        let bytes = self.words.len() * 4;
        assert!(index < bytes, "byte index {index} out of range for {bytes} bytes");
        let shift = 8 * (index % 4);
        let word = &mut self.words[index / 4];
        *word = (*word & !(0xFF << shift)) | (u32::from(value) << shift);
        self
    }

    pub fn build(self) -> BitVector {
        BitVector::from_words(self.words)
    }
}
