//! Decoded descriptors for the 256 direct and 256 CB-prefixed opcodes.

use lazy_static::lazy_static;

/// Byte introducing the second opcode table.
pub const PREFIX: u8 = 0xCB;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Direct,
    Prefixed,
}

/// Instructions sharing an addressing pattern and a flag policy.
///
/// Suffixes name operands: `R8`/`R16` registers, `N8`/`N16` immediates,
/// `Hlr` the byte at HL, `Hlru` the byte at HL with post-increment or
/// decrement, `S8`/`E8` signed offsets, `U3` a bit index, `Cc` a condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Nop,
    LdR8Hlr,
    LdAHlru,
    LdABcr,
    LdADer,
    LdAN8r,
    LdACr,
    LdAN16r,
    LdR8N8,
    LdR16SpN16,
    PopR16,
    LdHlrR8,
    LdHlruA,
    LdBcrA,
    LdDerA,
    LdN8rA,
    LdCrA,
    LdN16rA,
    LdHlrN8,
    LdN16rSp,
    LdR8R8,
    LdSpHl,
    PushR16,
    AddAR8,
    AddAN8,
    AddAHlr,
    IncR8,
    IncHlr,
    IncR16Sp,
    AddHlR16Sp,
    LdHlSpS8,
    SubAR8,
    SubAN8,
    SubAHlr,
    DecR8,
    DecHlr,
    CpAR8,
    CpAN8,
    CpAHlr,
    DecR16Sp,
    AndAR8,
    AndAN8,
    AndAHlr,
    OrAR8,
    OrAN8,
    OrAHlr,
    XorAR8,
    XorAN8,
    XorAHlr,
    Cpl,
    RotCa,
    RotA,
    RotCR8,
    RotR8,
    RotCHlr,
    RotHlr,
    SwapR8,
    SwapHlr,
    SlaR8,
    SraR8,
    SrlR8,
    SlaHlr,
    SraHlr,
    SrlHlr,
    BitU3R8,
    BitU3Hlr,
    ChgU3R8,
    ChgU3Hlr,
    Daa,
    Sccf,
    JpHl,
    JpN16,
    JpCcN16,
    JrE8,
    JrCcE8,
    CallN16,
    CallCcN16,
    RstU3,
    Ret,
    RetCc,
    Edi,
    Reti,
    Halt,
    Stop,
    /// Encodings the hardware leaves unassigned (and the prefix byte itself
    /// in the direct table).
    Illegal,
}

/// Static description of one encoding. Cycle counts are machine cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Opcode {
    pub family: Family,
    pub kind: Kind,
    pub encoding: u8,
    pub total_bytes: u8,
    pub cycles: u8,
    /// Charged on top of `cycles` when a conditional branch is taken.
    pub additional_cycles: u8,
}

lazy_static! {
    static ref DIRECT_OPCODES: [Opcode; 256] = std::array::from_fn(|i| decode_direct(i as u8));
    static ref PREFIXED_OPCODES: [Opcode; 256] =
        std::array::from_fn(|i| decode_prefixed(i as u8));
}

#[inline]
pub fn direct(encoding: u8) -> &'static Opcode {
    &DIRECT_OPCODES[usize::from(encoding)]
}

#[inline]
pub fn prefixed(encoding: u8) -> &'static Opcode {
    &PREFIXED_OPCODES[usize::from(encoding)]
}

fn decode_direct(op: u8) -> Opcode {
    use Family::*;

    let (family, total_bytes, cycles, additional_cycles) = match op {
        0x00 => (Nop, 1, 1, 0),
        0x10 => (Stop, 2, 1, 0),
        0x76 => (Halt, 1, 1, 0),
        0x40..=0x7F => match ((op >> 3) & 7, op & 7) {
            (6, _) => (LdHlrR8, 1, 2, 0),
            (_, 6) => (LdR8Hlr, 1, 2, 0),
            _ => (LdR8R8, 1, 1, 0),
        },
        0x80..=0xBF => {
            let hl = op & 7 == 6;
            let family = match ((op >> 3) & 7, hl) {
                (0 | 1, false) => AddAR8,
                (0 | 1, true) => AddAHlr,
                (2 | 3, false) => SubAR8,
                (2 | 3, true) => SubAHlr,
                (4, false) => AndAR8,
                (4, true) => AndAHlr,
                (5, false) => XorAR8,
                (5, true) => XorAHlr,
                (6, false) => OrAR8,
                (6, true) => OrAHlr,
                (_, false) => CpAR8,
                (_, true) => CpAHlr,
            };
            (family, 1, if hl { 2 } else { 1 }, 0)
        }
        0xC6 | 0xCE => (AddAN8, 2, 2, 0),
        0xD6 | 0xDE => (SubAN8, 2, 2, 0),
        0xE6 => (AndAN8, 2, 2, 0),
        0xEE => (XorAN8, 2, 2, 0),
        0xF6 => (OrAN8, 2, 2, 0),
        0xFE => (CpAN8, 2, 2, 0),
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => (LdR8N8, 2, 2, 0),
        0x36 => (LdHlrN8, 2, 3, 0),
        0x22 | 0x32 => (LdHlruA, 1, 2, 0),
        0x2A | 0x3A => (LdAHlru, 1, 2, 0),
        0x02 => (LdBcrA, 1, 2, 0),
        0x12 => (LdDerA, 1, 2, 0),
        0x0A => (LdABcr, 1, 2, 0),
        0x1A => (LdADer, 1, 2, 0),
        0xE0 => (LdN8rA, 2, 3, 0),
        0xF0 => (LdAN8r, 2, 3, 0),
        0xE2 => (LdCrA, 1, 2, 0),
        0xF2 => (LdACr, 1, 2, 0),
        0xEA => (LdN16rA, 3, 4, 0),
        0xFA => (LdAN16r, 3, 4, 0),
        0x01 | 0x11 | 0x21 | 0x31 => (LdR16SpN16, 3, 3, 0),
        0x08 => (LdN16rSp, 3, 5, 0),
        0xF9 => (LdSpHl, 1, 2, 0),
        0xC1 | 0xD1 | 0xE1 | 0xF1 => (PopR16, 1, 3, 0),
        0xC5 | 0xD5 | 0xE5 | 0xF5 => (PushR16, 1, 4, 0),
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => (IncR8, 1, 1, 0),
        0x34 => (IncHlr, 1, 3, 0),
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => (DecR8, 1, 1, 0),
        0x35 => (DecHlr, 1, 3, 0),
        0x03 | 0x13 | 0x23 | 0x33 => (IncR16Sp, 1, 2, 0),
        0x0B | 0x1B | 0x2B | 0x3B => (DecR16Sp, 1, 2, 0),
        0x09 | 0x19 | 0x29 | 0x39 => (AddHlR16Sp, 1, 2, 0),
        // ADD SP,e8
        0xE8 => (LdHlSpS8, 2, 4, 0),
        // LD HL,SP+e8
        0xF8 => (LdHlSpS8, 2, 3, 0),
        0x07 | 0x0F => (RotCa, 1, 1, 0),
        0x17 | 0x1F => (RotA, 1, 1, 0),
        0x27 => (Daa, 1, 1, 0),
        0x2F => (Cpl, 1, 1, 0),
        0x37 | 0x3F => (Sccf, 1, 1, 0),
        0xC3 => (JpN16, 3, 4, 0),
        0xE9 => (JpHl, 1, 1, 0),
        0xC2 | 0xCA | 0xD2 | 0xDA => (JpCcN16, 3, 3, 1),
        0x18 => (JrE8, 2, 3, 0),
        0x20 | 0x28 | 0x30 | 0x38 => (JrCcE8, 2, 2, 1),
        0xCD => (CallN16, 3, 6, 0),
        0xC4 | 0xCC | 0xD4 | 0xDC => (CallCcN16, 3, 3, 3),
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => (RstU3, 1, 4, 0),
        0xC9 => (Ret, 1, 4, 0),
        0xC0 | 0xC8 | 0xD0 | 0xD8 => (RetCc, 1, 2, 3),
        0xD9 => (Reti, 1, 4, 0),
        0xF3 | 0xFB => (Edi, 1, 1, 0),
        _ => (Illegal, 1, 1, 0),
    };

    Opcode {
        family,
        kind: Kind::Direct,
        encoding: op,
        total_bytes,
        cycles,
        additional_cycles,
    }
}

fn decode_prefixed(op: u8) -> Opcode {
    use Family::*;

    let hl = op & 7 == 6;
    let (family, cycles) = match (op >> 6, (op >> 3) & 7, hl) {
        (0, 0 | 1, false) => (RotCR8, 2),
        (0, 0 | 1, true) => (RotCHlr, 4),
        (0, 2 | 3, false) => (RotR8, 2),
        (0, 2 | 3, true) => (RotHlr, 4),
        (0, 4, false) => (SlaR8, 2),
        (0, 4, true) => (SlaHlr, 4),
        (0, 5, false) => (SraR8, 2),
        (0, 5, true) => (SraHlr, 4),
        (0, 6, false) => (SwapR8, 2),
        (0, 6, true) => (SwapHlr, 4),
        (0, _, false) => (SrlR8, 2),
        (0, _, true) => (SrlHlr, 4),
        (1, _, false) => (BitU3R8, 2),
        (1, _, true) => (BitU3Hlr, 3),
        (_, _, false) => (ChgU3R8, 2),
        (_, _, true) => (ChgU3Hlr, 4),
    };

    Opcode {
        family,
        kind: Kind::Prefixed,
        encoding: op,
        total_bytes: 2,
        cycles,
        additional_cycles: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_indexed_by_encoding() {
        for i in 0..=255u8 {
            assert_eq!(direct(i).encoding, i);
            assert_eq!(direct(i).kind, Kind::Direct);
            assert_eq!(prefixed(i).encoding, i);
            assert_eq!(prefixed(i).kind, Kind::Prefixed);
            assert_eq!(prefixed(i).total_bytes, 2);
        }
    }

    #[test]
    fn unassigned_direct_encodings_are_illegal() {
        let illegal: Vec<u8> = (0..=255u8)
            .filter(|&i| direct(i).family == Family::Illegal)
            .collect();
        assert_eq!(
            illegal,
            vec![0xCB, 0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD]
        );
    }

    #[test]
    fn conditional_branches_carry_extra_cycles() {
        for op in [0x20u8, 0x28, 0x30, 0x38, 0xC2, 0xC4, 0xC0] {
            assert!(direct(op).additional_cycles > 0, "{op:#04X}");
        }
        assert_eq!(direct(0xC4).cycles + direct(0xC4).additional_cycles, direct(0xCD).cycles);
        assert_eq!(direct(0xC0).cycles + direct(0xC0).additional_cycles, 5);
        assert_eq!(direct(0x18).additional_cycles, 0);
    }

    #[test]
    fn hl_indirect_forms_cost_more() {
        assert_eq!(direct(0x46).family, Family::LdR8Hlr);
        assert_eq!(direct(0x70).family, Family::LdHlrR8);
        assert_eq!(direct(0x86).cycles, 2);
        assert_eq!(direct(0x80).cycles, 1);
        assert_eq!(prefixed(0x46).family, Family::BitU3Hlr);
        assert_eq!(prefixed(0x46).cycles, 3);
        assert_eq!(prefixed(0xC6).family, Family::ChgU3Hlr);
        assert_eq!(prefixed(0xC6).cycles, 4);
        assert_eq!(prefixed(0x37).family, Family::SwapR8);
    }
}
