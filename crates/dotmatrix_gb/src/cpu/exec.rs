use anyhow::{bail, Result};

use super::alu::{self, Flags, ValueFlags};
use super::helpers::{bit_index, hl_increment, r16, r8, rot_dir, FlagSrc};
use super::opcode::{self, Family};
use super::{Cpu, Reg, Reg16};
use crate::bits;
use crate::bus::Bus;

use FlagSrc::{Alu, Cpu as Keep, V0, V1};

impl Cpu {
    /// Fetches, decodes and executes the instruction at PC.
    pub(super) fn dispatch(&mut self, bus: &mut Bus<'_, '_>) -> Result<()> {
        let first = self.read8(bus, self.pc);
        let op = if first == opcode::PREFIX {
            opcode::prefixed(self.read8_after_opcode(bus))
        } else {
            opcode::direct(first)
        };
        let enc = op.encoding;
        log::trace!("{:04X}: {:?} ({:#04X})", self.pc, op.family, enc);

        let mut next_pc = self.pc.wrapping_add(u16::from(op.total_bytes));
        let mut cycles = u64::from(op.cycles);
        let mut halt = false;

        match op.family {
            Family::Nop => {}

            // Loads
            Family::LdR8Hlr => {
                let v = self.read8_at_hl(bus);
                self.set_reg(r8(enc, 3), v);
            }
            Family::LdAHlru => {
                let hl = self.reg16(Reg16::HL);
                let v = self.read8(bus, hl);
                self.set_reg(Reg::A, v);
                self.set_reg16(Reg16::HL, hl.wrapping_add(hl_increment(enc)));
            }
            Family::LdABcr => {
                let v = self.read8(bus, self.reg16(Reg16::BC));
                self.set_reg(Reg::A, v);
            }
            Family::LdADer => {
                let v = self.read8(bus, self.reg16(Reg16::DE));
                self.set_reg(Reg::A, v);
            }
            Family::LdAN8r => {
                let address = 0xFF00 | u16::from(self.read8_after_opcode(bus));
                let v = self.read8(bus, address);
                self.set_reg(Reg::A, v);
            }
            Family::LdACr => {
                let v = self.read8(bus, 0xFF00 | u16::from(self.reg(Reg::C)));
                self.set_reg(Reg::A, v);
            }
            Family::LdAN16r => {
                let address = self.read16_after_opcode(bus);
                let v = self.read8(bus, address);
                self.set_reg(Reg::A, v);
            }
            Family::LdR8N8 => {
                let v = self.read8_after_opcode(bus);
                self.set_reg(r8(enc, 3), v);
            }
            Family::LdR16SpN16 => {
                let v = self.read16_after_opcode(bus);
                self.set_reg16_sp(r16(enc), v);
            }
            Family::PopR16 => {
                let v = self.pop16(bus);
                self.set_reg16(r16(enc), v);
            }
            Family::LdHlrR8 => {
                let v = self.reg(r8(enc, 0));
                self.write8_at_hl(bus, v);
            }
            Family::LdHlruA => {
                let hl = self.reg16(Reg16::HL);
                let a = self.reg(Reg::A);
                self.write8(bus, hl, a);
                self.set_reg16(Reg16::HL, hl.wrapping_add(hl_increment(enc)));
            }
            Family::LdBcrA => {
                let (address, a) = (self.reg16(Reg16::BC), self.reg(Reg::A));
                self.write8(bus, address, a);
            }
            Family::LdDerA => {
                let (address, a) = (self.reg16(Reg16::DE), self.reg(Reg::A));
                self.write8(bus, address, a);
            }
            Family::LdN8rA => {
                let address = 0xFF00 | u16::from(self.read8_after_opcode(bus));
                let a = self.reg(Reg::A);
                self.write8(bus, address, a);
            }
            Family::LdCrA => {
                let (address, a) = (0xFF00 | u16::from(self.reg(Reg::C)), self.reg(Reg::A));
                self.write8(bus, address, a);
            }
            Family::LdN16rA => {
                let address = self.read16_after_opcode(bus);
                let a = self.reg(Reg::A);
                self.write8(bus, address, a);
            }
            Family::LdHlrN8 => {
                let v = self.read8_after_opcode(bus);
                self.write8_at_hl(bus, v);
            }
            Family::LdN16rSp => {
                let address = self.read16_after_opcode(bus);
                self.write16(bus, address, self.sp);
            }
            Family::LdR8R8 => {
                let v = self.reg(r8(enc, 0));
                self.set_reg(r8(enc, 3), v);
            }
            Family::LdSpHl => self.sp = self.reg16(Reg16::HL),
            Family::PushR16 => {
                let v = self.reg16(r16(enc));
                self.push16(bus, v);
            }

            // Add
            Family::AddAR8 => {
                let vf = alu::add(self.reg(Reg::A), self.reg(r8(enc, 0)), self.carry_in(enc));
                self.set_reg_flags(Reg::A, vf, Alu, V0, Alu, Alu);
            }
            Family::AddAN8 => {
                let n = self.read8_after_opcode(bus);
                let vf = alu::add(self.reg(Reg::A), n, self.carry_in(enc));
                self.set_reg_flags(Reg::A, vf, Alu, V0, Alu, Alu);
            }
            Family::AddAHlr => {
                let n = self.read8_at_hl(bus);
                let vf = alu::add(self.reg(Reg::A), n, self.carry_in(enc));
                self.set_reg_flags(Reg::A, vf, Alu, V0, Alu, Alu);
            }
            Family::IncR8 => {
                let reg = r8(enc, 3);
                let vf = alu::add(self.reg(reg), 1, false);
                self.set_reg_flags(reg, vf, Alu, V0, Alu, Keep);
            }
            Family::IncHlr => {
                let vf = alu::add(self.read8_at_hl(bus), 1, false);
                self.write_hl_flags(bus, vf, Alu, V0, Alu, Keep);
            }
            Family::IncR16Sp => {
                let reg = r16(enc);
                self.set_reg16_sp(reg, self.reg16_sp(reg).wrapping_add(1));
            }
            Family::AddHlR16Sp => {
                let vf = alu::add16_high(self.reg16(Reg16::HL), self.reg16_sp(r16(enc)));
                self.set_reg16(Reg16::HL, vf.value);
                self.combine_alu_flags(vf.flags, Keep, V0, Alu, Alu);
            }
            Family::LdHlSpS8 => {
                let offset = self.read8_after_opcode(bus) as i8 as u16;
                let vf = alu::add16_low(self.sp, offset);
                if bits::test_index(enc, 4) {
                    self.set_reg16(Reg16::HL, vf.value);
                } else {
                    self.sp = vf.value;
                }
                self.combine_alu_flags(vf.flags, V0, V0, Alu, Alu);
            }

            // Subtract or compare
            Family::SubAR8 => {
                let vf = alu::sub(self.reg(Reg::A), self.reg(r8(enc, 0)), self.carry_in(enc));
                self.set_reg_flags(Reg::A, vf, Alu, V1, Alu, Alu);
            }
            Family::SubAN8 => {
                let n = self.read8_after_opcode(bus);
                let vf = alu::sub(self.reg(Reg::A), n, self.carry_in(enc));
                self.set_reg_flags(Reg::A, vf, Alu, V1, Alu, Alu);
            }
            Family::SubAHlr => {
                let n = self.read8_at_hl(bus);
                let vf = alu::sub(self.reg(Reg::A), n, self.carry_in(enc));
                self.set_reg_flags(Reg::A, vf, Alu, V1, Alu, Alu);
            }
            Family::DecR8 => {
                let reg = r8(enc, 3);
                let vf = alu::sub(self.reg(reg), 1, false);
                self.set_reg_flags(reg, vf, Alu, V1, Alu, Keep);
            }
            Family::DecHlr => {
                let vf = alu::sub(self.read8_at_hl(bus), 1, false);
                self.write_hl_flags(bus, vf, Alu, V1, Alu, Keep);
            }
            Family::CpAR8 => {
                let vf = alu::sub(self.reg(Reg::A), self.reg(r8(enc, 0)), false);
                self.combine_alu_flags(vf.flags, Alu, V1, Alu, Alu);
            }
            Family::CpAN8 => {
                let n = self.read8_after_opcode(bus);
                let vf = alu::sub(self.reg(Reg::A), n, false);
                self.combine_alu_flags(vf.flags, Alu, V1, Alu, Alu);
            }
            Family::CpAHlr => {
                let n = self.read8_at_hl(bus);
                let vf = alu::sub(self.reg(Reg::A), n, false);
                self.combine_alu_flags(vf.flags, Alu, V1, Alu, Alu);
            }
            Family::DecR16Sp => {
                let reg = r16(enc);
                self.set_reg16_sp(reg, self.reg16_sp(reg).wrapping_sub(1));
            }

            // And, or, xor, complement
            Family::AndAN8 => {
                let n = self.read8_after_opcode(bus);
                let vf = alu::and(self.reg(Reg::A), n);
                self.set_reg_flags(Reg::A, vf, Alu, V0, V1, V0);
            }
            Family::AndAR8 => {
                let vf = alu::and(self.reg(Reg::A), self.reg(r8(enc, 0)));
                self.set_reg_flags(Reg::A, vf, Alu, V0, V1, V0);
            }
            Family::AndAHlr => {
                let vf = alu::and(self.reg(Reg::A), self.read8_at_hl(bus));
                self.set_reg_flags(Reg::A, vf, Alu, V0, V1, V0);
            }
            Family::OrAR8 => {
                let vf = alu::or(self.reg(Reg::A), self.reg(r8(enc, 0)));
                self.set_reg_flags(Reg::A, vf, Alu, V0, V0, V0);
            }
            Family::OrAN8 => {
                let n = self.read8_after_opcode(bus);
                let vf = alu::or(self.reg(Reg::A), n);
                self.set_reg_flags(Reg::A, vf, Alu, V0, V0, V0);
            }
            Family::OrAHlr => {
                let vf = alu::or(self.reg(Reg::A), self.read8_at_hl(bus));
                self.set_reg_flags(Reg::A, vf, Alu, V0, V0, V0);
            }
            Family::XorAR8 => {
                let vf = alu::xor(self.reg(Reg::A), self.reg(r8(enc, 0)));
                self.set_reg_flags(Reg::A, vf, Alu, V0, V0, V0);
            }
            Family::XorAN8 => {
                let n = self.read8_after_opcode(bus);
                let vf = alu::xor(self.reg(Reg::A), n);
                self.set_reg_flags(Reg::A, vf, Alu, V0, V0, V0);
            }
            Family::XorAHlr => {
                let vf = alu::xor(self.reg(Reg::A), self.read8_at_hl(bus));
                self.set_reg_flags(Reg::A, vf, Alu, V0, V0, V0);
            }
            Family::Cpl => {
                let a = !self.reg(Reg::A);
                self.set_reg(Reg::A, a);
                self.combine_alu_flags(Flags::empty(), Keep, V1, V1, Keep);
            }

            // Rotate, shift
            Family::RotCa => {
                let vf = alu::rotate(rot_dir(enc), self.reg(Reg::A));
                self.set_reg_flags(Reg::A, vf, V0, V0, V0, Alu);
            }
            Family::RotA => {
                let carry = self.flags().contains(Flags::C);
                let vf = alu::rotate_through_carry(rot_dir(enc), self.reg(Reg::A), carry);
                self.set_reg_flags(Reg::A, vf, V0, V0, V0, Alu);
            }
            Family::RotCR8 => {
                let reg = r8(enc, 0);
                let vf = alu::rotate(rot_dir(enc), self.reg(reg));
                self.set_reg_flags(reg, vf, Alu, V0, V0, Alu);
            }
            Family::RotR8 => {
                let reg = r8(enc, 0);
                let carry = self.flags().contains(Flags::C);
                let vf = alu::rotate_through_carry(rot_dir(enc), self.reg(reg), carry);
                self.set_reg_flags(reg, vf, Alu, V0, V0, Alu);
            }
            Family::RotCHlr => {
                let vf = alu::rotate(rot_dir(enc), self.read8_at_hl(bus));
                self.write_hl_flags(bus, vf, Alu, V0, V0, Alu);
            }
            Family::RotHlr => {
                let carry = self.flags().contains(Flags::C);
                let vf = alu::rotate_through_carry(rot_dir(enc), self.read8_at_hl(bus), carry);
                self.write_hl_flags(bus, vf, Alu, V0, V0, Alu);
            }
            Family::SwapR8 => {
                let reg = r8(enc, 0);
                let vf = alu::swap(self.reg(reg));
                self.set_reg_flags(reg, vf, Alu, V0, V0, V0);
            }
            Family::SwapHlr => {
                let vf = alu::swap(self.read8_at_hl(bus));
                self.write_hl_flags(bus, vf, Alu, V0, V0, V0);
            }
            Family::SlaR8 => {
                let reg = r8(enc, 0);
                let vf = alu::shift_left(self.reg(reg));
                self.set_reg_flags(reg, vf, Alu, V0, V0, Alu);
            }
            Family::SraR8 => {
                let reg = r8(enc, 0);
                let vf = alu::shift_right_arithmetic(self.reg(reg));
                self.set_reg_flags(reg, vf, Alu, V0, V0, Alu);
            }
            Family::SrlR8 => {
                let reg = r8(enc, 0);
                let vf = alu::shift_right_logical(self.reg(reg));
                self.set_reg_flags(reg, vf, Alu, V0, V0, Alu);
            }
            Family::SlaHlr => {
                let vf = alu::shift_left(self.read8_at_hl(bus));
                self.write_hl_flags(bus, vf, Alu, V0, V0, Alu);
            }
            Family::SraHlr => {
                let vf = alu::shift_right_arithmetic(self.read8_at_hl(bus));
                self.write_hl_flags(bus, vf, Alu, V0, V0, Alu);
            }
            Family::SrlHlr => {
                let vf = alu::shift_right_logical(self.read8_at_hl(bus));
                self.write_hl_flags(bus, vf, Alu, V0, V0, Alu);
            }

            // Bit test and set
            Family::BitU3R8 => {
                let vf = alu::test_bit(self.reg(r8(enc, 0)), bit_index(enc));
                self.combine_alu_flags(vf.flags, Alu, V0, V1, Keep);
            }
            Family::BitU3Hlr => {
                let vf = alu::test_bit(self.read8_at_hl(bus), bit_index(enc));
                self.combine_alu_flags(vf.flags, Alu, V0, V1, Keep);
            }
            Family::ChgU3R8 => {
                let reg = r8(enc, 0);
                let v = change_bit(self.reg(reg), enc);
                self.set_reg(reg, v);
            }
            Family::ChgU3Hlr => {
                let v = change_bit(self.read8_at_hl(bus), enc);
                self.write8_at_hl(bus, v);
            }

            // Misc. ALU
            Family::Daa => {
                let f = self.flags();
                let vf = alu::bcd_adjust(
                    self.reg(Reg::A),
                    f.contains(Flags::N),
                    f.contains(Flags::H),
                    f.contains(Flags::C),
                );
                self.set_reg_flags(Reg::A, vf, Alu, Keep, V0, Alu);
            }
            Family::Sccf => {
                // SCF sets C, CCF (bit 3) complements it.
                let carry = !(bits::test_index(enc, 3) && self.flags().contains(Flags::C));
                let alu = Flags::znhc(false, false, false, carry);
                self.combine_alu_flags(alu, Keep, V0, V0, Alu);
            }

            // Jumps
            Family::JpHl => next_pc = self.reg16(Reg16::HL),
            Family::JpN16 => next_pc = self.read16_after_opcode(bus),
            Family::JpCcN16 => {
                if self.condition(enc) {
                    next_pc = self.read16_after_opcode(bus);
                    cycles += u64::from(op.additional_cycles);
                }
            }
            Family::JrE8 => next_pc = relative(next_pc, self.read8_after_opcode(bus)),
            Family::JrCcE8 => {
                if self.condition(enc) {
                    next_pc = relative(next_pc, self.read8_after_opcode(bus));
                    cycles += u64::from(op.additional_cycles);
                }
            }

            // Calls and returns
            Family::CallN16 => {
                self.push16(bus, next_pc);
                next_pc = self.read16_after_opcode(bus);
            }
            Family::CallCcN16 => {
                if self.condition(enc) {
                    self.push16(bus, next_pc);
                    next_pc = self.read16_after_opcode(bus);
                    cycles += u64::from(op.additional_cycles);
                }
            }
            Family::RstU3 => {
                self.push16(bus, next_pc);
                next_pc = 8 * u16::from(bit_index(enc));
            }
            Family::Ret => next_pc = self.pop16(bus),
            Family::RetCc => {
                if self.condition(enc) {
                    next_pc = self.pop16(bus);
                    cycles += u64::from(op.additional_cycles);
                }
            }

            // Interrupts
            Family::Edi => self.ime = bits::test_index(enc, 3),
            Family::Reti => {
                self.ime = true;
                next_pc = self.pop16(bus);
            }

            // Misc control
            Family::Halt => halt = true,
            Family::Stop => bail!("STOP at {:04X} is not supported", self.pc),
            Family::Illegal => bail!("illegal opcode {enc:#04X} at {:04X}", self.pc),
        }

        self.pc = next_pc;
        self.next_non_idle_cycle = if halt {
            log::trace!("halted at {:04X}", self.pc);
            u64::MAX
        } else {
            self.next_non_idle_cycle + cycles
        };
        Ok(())
    }

    fn set_reg_flags(
        &mut self,
        reg: Reg,
        vf: ValueFlags,
        z: FlagSrc,
        n: FlagSrc,
        h: FlagSrc,
        c: FlagSrc,
    ) {
        self.set_reg(reg, vf.value);
        self.combine_alu_flags(vf.flags, z, n, h, c);
    }

    fn write_hl_flags(
        &mut self,
        bus: &mut Bus<'_, '_>,
        vf: ValueFlags,
        z: FlagSrc,
        n: FlagSrc,
        h: FlagSrc,
        c: FlagSrc,
    ) {
        self.write8_at_hl(bus, vf.value);
        self.combine_alu_flags(vf.flags, z, n, h, c);
    }
}

/// SET (bit 6 of the encoding) or RES of the bit named in bits 3–5.
fn change_bit(value: u8, encoding: u8) -> u8 {
    let mask = 1 << bit_index(encoding);
    if bits::test_index(encoding, 6) {
        value | mask
    } else {
        value & !mask
    }
}

fn relative(pc: u16, offset: u8) -> u16 {
    pc.wrapping_add(offset as i8 as u16)
}
