use std::marker::PhantomData;

use crate::bits::{self, Bit};

/// A closed set of register names, each mapped to a cell of a [`RegisterFile`].
pub trait Register: Copy {
    /// Number of names in the set.
    const COUNT: usize;

    fn index(self) -> usize;
}

/// Bank of 8-bit registers addressed by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile<R: Register> {
    cells: Box<[u8]>,
    names: PhantomData<R>,
}

impl<R: Register> Default for RegisterFile<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Register> RegisterFile<R> {
    /// All registers start at zero.
    pub fn new() -> Self {
        Self {
            cells: vec![0; R::COUNT].into_boxed_slice(),
            names: PhantomData,
        }
    }

    #[inline]
    pub fn get(&self, reg: R) -> u8 {
        self.cells[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: R, value: u8) {
        self.cells[reg.index()] = value;
    }

    pub fn test_bit<B: Bit>(&self, reg: R, bit: B) -> bool {
        bits::test(self.get(reg), bit)
    }

    pub fn set_bit<B: Bit>(&mut self, reg: R, bit: B, on: bool) {
        let value = bits::set(self.get(reg), bit, on);
        self.set(reg, value);
    }
}
