//! Divider and programmable timer (DIV, TIMA, TMA, TAC).

use anyhow::Result;

use crate::address_map::{REG_DIV, REG_TAC, REG_TIMA, REG_TMA};
use crate::bus::Bus;
use crate::component::{Clocked, Component};
use crate::cpu::Interrupt;

/// Main counter increment per machine cycle.
const COUNTER_STEP: u16 = 4;
const TAC_ENABLE: u8 = 0b100;
const TAC_UNUSED: u8 = 0xF8;

pub struct Timer {
    /// DIV is the upper byte.
    counter: u16,
    tima: u8,
    tma: u8,
    tac: u8,
    /// TIMA overflowed since the last flush to the bus.
    overflowed: bool,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            counter: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            overflowed: false,
        }
    }

    pub fn div(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    pub fn tima(&self) -> u8 {
        self.tima
    }

    /// Counter bit watched for the frequency selected by TAC.
    fn selected_bit(tac: u8) -> u16 {
        match tac & 0b11 {
            0 => 1 << 9,
            1 => 1 << 3,
            2 => 1 << 5,
            _ => 1 << 7,
        }
    }

    fn input(counter: u16, tac: u8) -> bool {
        tac & TAC_ENABLE != 0 && counter & Self::selected_bit(tac) != 0
    }

    /// Replaces counter and TAC, counting a falling edge of the timer input.
    fn update(&mut self, counter: u16, tac: u8) {
        let before = Self::input(self.counter, self.tac);
        self.counter = counter;
        self.tac = tac;
        if before && !Self::input(counter, tac) {
            self.increment_tima();
        }
    }

    fn increment_tima(&mut self) {
        match self.tima.checked_add(1) {
            Some(tima) => self.tima = tima,
            None => {
                log::trace!("TIMA overflow, reloading {:#04X}", self.tma);
                self.tima = self.tma;
                self.overflowed = true;
            }
        }
    }
}

impl Clocked for Timer {
    fn cycle(&mut self, _cycle: u64, bus: &mut Bus<'_, '_>) -> Result<()> {
        self.update(self.counter.wrapping_add(COUNTER_STEP), self.tac);
        if self.overflowed {
            self.overflowed = false;
            bus.request_interrupt(Interrupt::Timer);
        }
        Ok(())
    }
}

impl Component for Timer {
    fn read(&self, address: u16) -> Option<u8> {
        match address {
            REG_DIV => Some(self.div()),
            REG_TIMA => Some(self.tima),
            REG_TMA => Some(self.tma),
            REG_TAC => Some(self.tac | TAC_UNUSED),
            _ => None,
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        match address {
            REG_DIV => self.update(0, self.tac),
            REG_TIMA => self.tima = data,
            REG_TMA => self.tma = data,
            REG_TAC => self.update(self.counter, data & !TAC_UNUSED),
            _ => {}
        }
    }
}
