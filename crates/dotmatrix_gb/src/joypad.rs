//! P1 joypad register and button state.

use anyhow::Result;

use crate::address_map::REG_P1;
use crate::bits::{self, Bit};
use crate::bus::Bus;
use crate::component::{Clocked, Component};
use crate::cpu::Interrupt;

/// Buttons in state-bit order: the direction line is bits 0..4, the
/// action line bits 4..8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Button {
    Right = 0,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Bit for Button {
    fn index(self) -> u8 {
        self as u8
    }
}

/// P1 bits that select a line when written low.
const SELECT_DIRECTIONS: u8 = 1 << 4;
const SELECT_ACTIONS: u8 = 1 << 5;
const SELECT_MASK: u8 = SELECT_DIRECTIONS | SELECT_ACTIONS;
const LINES_MASK: u8 = 0x0F;

pub struct Joypad {
    /// One bit per [`Button`], set while held.
    pressed: u8,
    /// P1 bits 4 and 5 as last written.
    select: u8,
    raised: bool,
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Joypad {
    pub fn new() -> Self {
        Self {
            pressed: 0,
            select: SELECT_MASK,
            raised: false,
        }
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        bits::test(self.pressed, button)
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.update(bits::set(self.pressed, button, pressed), self.select);
    }

    /// Active-high input lines seen through the current selection.
    fn lines(pressed: u8, select: u8) -> u8 {
        let mut lines = 0;
        if select & SELECT_DIRECTIONS == 0 {
            lines |= pressed & LINES_MASK;
        }
        if select & SELECT_ACTIONS == 0 {
            lines |= pressed >> 4;
        }
        lines
    }

    fn update(&mut self, pressed: u8, select: u8) {
        let before = Self::lines(self.pressed, self.select);
        self.pressed = pressed;
        self.select = select;
        if Self::lines(pressed, select) & !before != 0 {
            self.raised = true;
        }
    }
}

impl Clocked for Joypad {
    fn cycle(&mut self, _cycle: u64, bus: &mut Bus<'_, '_>) -> Result<()> {
        if self.raised {
            self.raised = false;
            bus.request_interrupt(Interrupt::Joypad);
        }
        Ok(())
    }
}

impl Component for Joypad {
    fn read(&self, address: u16) -> Option<u8> {
        (address == REG_P1).then(|| {
            let released = !Self::lines(self.pressed, self.select) & LINES_MASK;
            0xC0 | self.select | released
        })
    }

    fn write(&mut self, address: u16, data: u8) {
        if address == REG_P1 {
            self.update(self.pressed, data & SELECT_MASK);
        }
    }
}
