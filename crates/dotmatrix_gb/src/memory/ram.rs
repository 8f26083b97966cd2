use std::ops::Range;

use crate::component::Component;

/// Fixed-size, zero-initialised byte store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ram {
    data: Box<[u8]>,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn read(&self, index: usize) -> u8 {
        self.data[index]
    }

    #[inline]
    pub fn write(&mut self, index: usize, value: u8) {
        self.data[index] = value;
    }
}

/// Maps a [`Ram`] onto `[start, start + size)` and optionally onto a
/// second, mirrored window.
#[derive(Clone, Debug)]
pub struct RamController {
    ram: Ram,
    start: u16,
    mirror: Option<Range<u16>>,
}

impl RamController {
    pub fn new(ram: Ram, start: u16) -> Self {
        assert!(
            usize::from(start) + ram.size() <= 0x1_0000,
            "RAM at {start:#06X} does not fit the address space"
        );
        Self {
            ram,
            start,
            mirror: None,
        }
    }

    /// Also answers on `range`, which aliases the beginning of the RAM.
    pub fn with_mirror(mut self, range: Range<u16>) -> Self {
        assert!(
            usize::from(range.end - range.start) <= self.ram.size(),
            "mirror {range:04X?} is larger than the RAM it aliases"
        );
        self.mirror = Some(range);
        self
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    fn index(&self, address: u16) -> Option<usize> {
        let offset = usize::from(address.wrapping_sub(self.start));
        if address >= self.start && offset < self.ram.size() {
            return Some(offset);
        }
        self.mirror
            .as_ref()
            .filter(|mirror| mirror.contains(&address))
            .map(|mirror| usize::from(address - mirror.start))
    }
}

impl Component for RamController {
    fn read(&self, address: u16) -> Option<u8> {
        self.index(address).map(|index| self.ram.read(index))
    }

    fn write(&mut self, address: u16, data: u8) {
        if let Some(index) = self.index(address) {
            self.ram.write(index, data);
        }
    }
}
