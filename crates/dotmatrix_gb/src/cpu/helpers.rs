use super::alu::{Flags, RotDir};
use super::{Cpu, Reg, Reg16};
use crate::bits;
use crate::bus::Bus;
use crate::component::Component;

/// Where an instruction takes each condition flag from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum FlagSrc {
    /// Forced to 0.
    V0,
    /// Forced to 1.
    V1,
    /// Taken from the ALU result.
    Alu,
    /// Left as it is in F.
    Cpu,
}

impl FlagSrc {
    fn mask(z: FlagSrc, n: FlagSrc, h: FlagSrc, c: FlagSrc, src: FlagSrc) -> Flags {
        Flags::znhc(z == src, n == src, h == src, c == src)
    }
}

impl Cpu {
    // Memory access. The processor answers for its own addresses first.

    pub(super) fn read8(&self, bus: &Bus<'_, '_>, address: u16) -> u8 {
        self.read(address).unwrap_or_else(|| bus.read(address))
    }

    pub(super) fn write8(&mut self, bus: &mut Bus<'_, '_>, address: u16, data: u8) {
        self.write(address, data);
        bus.write(address, data);
    }

    pub(super) fn read16(&self, bus: &Bus<'_, '_>, address: u16) -> u16 {
        let low = self.read8(bus, address);
        let high = self.read8(bus, address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    pub(super) fn write16(&mut self, bus: &mut Bus<'_, '_>, address: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write8(bus, address, low);
        self.write8(bus, address.wrapping_add(1), high);
    }

    pub(super) fn read8_after_opcode(&self, bus: &Bus<'_, '_>) -> u8 {
        self.read8(bus, self.pc.wrapping_add(1))
    }

    pub(super) fn read16_after_opcode(&self, bus: &Bus<'_, '_>) -> u16 {
        self.read16(bus, self.pc.wrapping_add(1))
    }

    pub(super) fn read8_at_hl(&self, bus: &Bus<'_, '_>) -> u8 {
        self.read8(bus, self.reg16(Reg16::HL))
    }

    pub(super) fn write8_at_hl(&mut self, bus: &mut Bus<'_, '_>, data: u8) {
        let hl = self.reg16(Reg16::HL);
        self.write8(bus, hl, data);
    }

    pub(super) fn push16(&mut self, bus: &mut Bus<'_, '_>, value: u16) {
        self.sp = self.sp.wrapping_sub(2);
        self.write16(bus, self.sp, value);
    }

    pub(super) fn pop16(&mut self, bus: &Bus<'_, '_>) -> u16 {
        let value = self.read16(bus, self.sp);
        self.sp = self.sp.wrapping_add(2);
        value
    }

    // Registers.

    pub(super) fn set_reg(&mut self, reg: Reg, value: u8) {
        self.regs.set(reg, value);
    }

    /// The low nibble of F always reads 0.
    pub(super) fn set_reg16(&mut self, reg: Reg16, value: u16) {
        let (high, low) = reg.halves();
        let [h, l] = value.to_be_bytes();
        self.regs.set(high, h);
        self.regs.set(low, if reg == Reg16::AF { l & 0xF0 } else { l });
    }

    /// Like [`Cpu::reg16`], with SP standing in for AF.
    pub(super) fn reg16_sp(&self, reg: Reg16) -> u16 {
        if reg == Reg16::AF {
            self.sp
        } else {
            self.reg16(reg)
        }
    }

    pub(super) fn set_reg16_sp(&mut self, reg: Reg16, value: u16) {
        if reg == Reg16::AF {
            self.sp = value;
        } else {
            self.set_reg16(reg, value);
        }
    }

    pub(super) fn flags(&self) -> Flags {
        Flags::from_bits_truncate(self.regs.get(Reg::F))
    }

    /// Merges `alu` into F according to the per-flag sources.
    pub(super) fn combine_alu_flags(
        &mut self,
        alu: Flags,
        z: FlagSrc,
        n: FlagSrc,
        h: FlagSrc,
        c: FlagSrc,
    ) {
        let keep = FlagSrc::mask(z, n, h, c, FlagSrc::Cpu);
        let from_alu = FlagSrc::mask(z, n, h, c, FlagSrc::Alu);
        let ones = FlagSrc::mask(z, n, h, c, FlagSrc::V1);
        let flags = (self.flags() & keep) | (alu & from_alu) | ones;
        self.regs.set(Reg::F, flags.bits());
    }
}

// Operand fields of the encoding.

/// 8-bit register in the 3-bit field at `start`. Index 6 is (HL), which
/// only the `Hlr` families use, so it never reaches this decoder.
pub(super) fn r8(encoding: u8, start: u8) -> Reg {
    match bits::extract(encoding, start, 3) {
        0 => Reg::B,
        1 => Reg::C,
        2 => Reg::D,
        3 => Reg::E,
        4 => Reg::H,
        5 => Reg::L,
        7 => Reg::A,
        _ => unreachable!("(HL) operand decoded as a register in {encoding:#04X}"),
    }
}

/// Register pair in bits 4–5. `AF` doubles as SP for the `R16Sp` families.
pub(super) fn r16(encoding: u8) -> Reg16 {
    match bits::extract(encoding, 4, 2) {
        0 => Reg16::BC,
        1 => Reg16::DE,
        2 => Reg16::HL,
        _ => Reg16::AF,
    }
}

/// +1 for `HL+` forms, -1 for `HL-` forms.
pub(super) fn hl_increment(encoding: u8) -> u16 {
    if bits::test_index(encoding, 4) {
        0xFFFF
    } else {
        1
    }
}

/// Bit 3 selects rotation to the right.
pub(super) fn rot_dir(encoding: u8) -> RotDir {
    if bits::test_index(encoding, 3) {
        RotDir::Right
    } else {
        RotDir::Left
    }
}

pub(super) fn bit_index(encoding: u8) -> u8 {
    bits::extract(encoding, 3, 3)
}

impl Cpu {
    /// Carry input of ADC/SBC: bit 3 of the encoding set and C set.
    pub(super) fn carry_in(&self, encoding: u8) -> bool {
        bits::test_index(encoding, 3) && self.flags().contains(Flags::C)
    }

    /// Condition in bits 3–4: NZ, Z, NC, C.
    pub(super) fn condition(&self, encoding: u8) -> bool {
        let flags = self.flags();
        match bits::extract(encoding, 3, 2) {
            0 => !flags.contains(Flags::Z),
            1 => flags.contains(Flags::Z),
            2 => !flags.contains(Flags::C),
            _ => flags.contains(Flags::C),
        }
    }
}
