//! LR35902 processor core.
//!
//! The processor is cycle-driven: it executes a whole instruction on the
//! first tick it is active and then sleeps until the instruction's cost in
//! machine cycles has elapsed.

pub mod alu;
mod exec;
mod helpers;
pub mod opcode;

use anyhow::Result;

use crate::address_map::{HIGH_RAM_END, HIGH_RAM_SIZE, HIGH_RAM_START, REG_IE, REG_IF};
use crate::bits::{self, Bit};
use crate::bus::{Bus, InterruptSink};
use crate::component::{Clocked, Component};
use crate::memory::Ram;
use crate::register_file::{Register, RegisterFile};

/// Machine cycles spent entering an interrupt handler.
const INTERRUPT_SERVICE_CYCLES: u64 = 5;

/// 8-bit registers. F holds the condition flags in its upper nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
}

impl Register for Reg {
    const COUNT: usize = 8;

    fn index(self) -> usize {
        self as usize
    }
}

/// Register pairs, high register first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg16 {
    AF,
    BC,
    DE,
    HL,
}

impl Reg16 {
    fn halves(self) -> (Reg, Reg) {
        match self {
            Reg16::AF => (Reg::A, Reg::F),
            Reg16::BC => (Reg::B, Reg::C),
            Reg16::DE => (Reg::D, Reg::E),
            Reg16::HL => (Reg::H, Reg::L),
        }
    }
}

/// Interrupt sources, in priority order. The discriminant is the bit
/// index in IE and IF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Interrupt {
    VBlank = 0,
    LcdStat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    /// Address of the handler.
    pub fn vector(self) -> u16 {
        0x40 + 8 * u16::from(self as u8)
    }

    /// Highest-priority interrupt present in `mask`.
    fn highest_priority(mask: u8) -> Option<Interrupt> {
        Interrupt::ALL.into_iter().find(|i| bits::test(mask, *i))
    }
}

impl Bit for Interrupt {
    fn index(self) -> u8 {
        self as u8
    }
}

pub struct Cpu {
    regs: RegisterFile<Reg>,
    sp: u16,
    pc: u16,
    /// Interrupt master enable.
    ime: bool,
    /// IE (0xFFFF).
    interrupt_enable: u8,
    /// IF (0xFF0F).
    interrupt_flags: u8,
    high_ram: Ram,
    /// First cycle at which the processor acts again; `u64::MAX` while halted.
    next_non_idle_cycle: u64,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Power-on state: every register zero, PC at the boot ROM entry.
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            sp: 0,
            pc: 0,
            ime: false,
            interrupt_enable: 0,
            interrupt_flags: 0,
            high_ram: Ram::new(HIGH_RAM_SIZE),
            next_non_idle_cycle: 0,
        }
    }

    /// Registers as the DMG boot ROM leaves them when it jumps to 0x0100.
    pub(crate) fn apply_post_boot_state(&mut self) {
        self.set_reg16(Reg16::AF, 0x01B0);
        self.set_reg16(Reg16::BC, 0x0013);
        self.set_reg16(Reg16::DE, 0x00D8);
        self.set_reg16(Reg16::HL, 0x014D);
        self.sp = 0xFFFE;
        self.pc = 0x0100;
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline]
    pub fn sp(&self) -> u16 {
        self.sp
    }

    #[inline]
    pub fn reg(&self, reg: Reg) -> u8 {
        self.regs.get(reg)
    }

    pub fn reg16(&self, reg: Reg16) -> u16 {
        let (high, low) = reg.halves();
        u16::from_be_bytes([self.regs.get(high), self.regs.get(low)])
    }

    pub fn ime(&self) -> bool {
        self.ime
    }

    /// True while HALT is waiting for an interrupt.
    pub fn is_halted(&self) -> bool {
        self.next_non_idle_cycle == u64::MAX
    }

    /// Sets the request bit of `interrupt` in IF.
    pub fn request_interrupt(&mut self, interrupt: Interrupt) {
        self.interrupt_flags |= interrupt.mask();
    }

    fn pending_interrupts(&self) -> u8 {
        self.interrupt_enable & self.interrupt_flags & 0x1F
    }

    fn service_interrupt(&mut self, bus: &mut Bus<'_, '_>, interrupt: Interrupt) {
        log::debug!(
            "servicing {interrupt:?} interrupt at PC={:04X}, vector {:04X}",
            self.pc,
            interrupt.vector()
        );
        self.ime = false;
        self.interrupt_flags &= !interrupt.mask();
        self.push16(bus, self.pc);
        self.pc = interrupt.vector();
        self.next_non_idle_cycle += INTERRUPT_SERVICE_CYCLES;
    }

    fn really_cycle(&mut self, bus: &mut Bus<'_, '_>) -> Result<()> {
        let pending = self.pending_interrupts();
        match Interrupt::highest_priority(pending) {
            Some(interrupt) if self.ime => {
                self.service_interrupt(bus, interrupt);
                Ok(())
            }
            _ => self.dispatch(bus),
        }
    }
}

impl Clocked for Cpu {
    fn cycle(&mut self, cycle: u64, bus: &mut Bus<'_, '_>) -> Result<()> {
        // A pending interrupt wakes a halted processor even with IME clear.
        if self.next_non_idle_cycle == u64::MAX && self.pending_interrupts() != 0 {
            self.next_non_idle_cycle = cycle;
        }
        if cycle < self.next_non_idle_cycle {
            return Ok(());
        }
        self.really_cycle(bus)
    }
}

impl InterruptSink for Cpu {
    fn request_interrupt(&mut self, interrupt: Interrupt) {
        Cpu::request_interrupt(self, interrupt);
    }
}

impl Component for Cpu {
    fn read(&self, address: u16) -> Option<u8> {
        match address {
            REG_IE => Some(self.interrupt_enable),
            REG_IF => Some(self.interrupt_flags),
            HIGH_RAM_START..HIGH_RAM_END => {
                Some(self.high_ram.read(usize::from(address - HIGH_RAM_START)))
            }
            _ => None,
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        match address {
            REG_IE => self.interrupt_enable = data,
            REG_IF => self.interrupt_flags = data,
            HIGH_RAM_START..HIGH_RAM_END => {
                self.high_ram.write(usize::from(address - HIGH_RAM_START), data)
            }
            _ => {}
        }
    }
}
