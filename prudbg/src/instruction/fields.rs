//! Field level view of an instruction word and the small operand types the
//! decoder builds from it.

use bitfield::bitfield;
use std::fmt;

bitfield! {
    /// A raw PRU instruction word.
    ///
    /// The fields overlap: which of them are meaningful depends on the
    /// instruction format selected by [`InstructionWord::format`].
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct InstructionWord(u32);
    impl Debug;
    /// Primary format, the top three bits.
    pub u8, format, _: 31, 29;
    /// ALU operation of format 0, sub-operation of format 1.
    pub u8, op, _: 28, 25;
    /// Second operand is an immediate instead of a register.
    pub io, _: 24;
    pub u8, rs2_sel, _: 23, 21;
    pub u8, rs2, _: 20, 16;
    pub u8, imm8, _: 23, 16;
    pub u16, imm16, _: 23, 8;
    pub u8, rs1_sel, _: 15, 13;
    pub u8, rs1, _: 12, 8;
    pub u8, rd_sel, _: 7, 5;
    pub u8, rd, _: 4, 0;

    /// Test code of the quick arithmetic branches.
    pub u8, arith_test, _: 29, 27;
    /// Test code of the quick bit branches.
    pub u8, bit_test, _: 28, 27;
    /// Bit number of an immediate bit test.
    pub u8, bit_number, _: 20, 16;
    pub u8, branch_high, _: 26, 25;
    pub u8, branch_low, _: 7, 0;

    /// Set for loads, clear for stores.
    pub load, _: 28;
    pub u8, burst_high, _: 27, 25;
    pub u8, burst_mid, _: 15, 13;
    pub burst_low, _: 7;
    /// Start byte inside the data register of a burst transfer.
    pub u8, data_byte, _: 6, 5;

    pub u8, mvi_dst_mode, _: 24, 23;
    pub u8, mvi_src_mode, _: 22, 21;
    /// Three operand forms of MVI, which are not decoded.
    pub mvi_three_operand, _: 20;
    pub u8, mvi_width, _: 17, 16;

    /// Operation bits of the crossbar transfers, bit 28 is ignored.
    pub u8, xfr_op, _: 29, 23;
    pub u8, xfr_device, _: 22, 15;
    pub u8, xfr_length, _: 13, 7;
    pub u8, xfr_byte, _: 6, 5;

    /// ILOOP instead of LOOP.
    pub indexed_loop, _: 15;
    /// SLP wakes on an event.
    pub wake_on_event, _: 23;
}

impl InstructionWord {
    /// The raw instruction word.
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// The branch offset of the quick branch formats.
    ///
    /// The ten bit offset is split over bits 26..25 and 7..0 and is
    /// sign-extended.
    pub fn branch_offset(&self) -> i16 {
        let offset = (i16::from(self.branch_high()) << 8) | i16::from(self.branch_low());
        if offset & 0x200 != 0 {
            offset - 0x400
        } else {
            offset
        }
    }

    /// The seven bit burst length field, gathered from three places.
    pub fn burst_length(&self) -> u8 {
        (self.burst_high() << 4) | (self.burst_mid() << 1) | u8::from(self.burst_low())
    }
}

/// The part of a register an operand accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    B0,
    B1,
    B2,
    B3,
    W0,
    W1,
    W2,
    /// The complete 32 bit register, written without a suffix.
    Full,
}

impl Field {
    /// Decode a three bit field selector.
    pub fn from_selector(selector: u8) -> Self {
        match selector & 0x7 {
            0 => Self::B0,
            1 => Self::B1,
            2 => Self::B2,
            3 => Self::B3,
            4 => Self::W0,
            5 => Self::W1,
            6 => Self::W2,
            _ => Self::Full,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::B0 => ".b0",
            Self::B1 => ".b1",
            Self::B2 => ".b2",
            Self::B3 => ".b3",
            Self::W0 => ".w0",
            Self::W1 => ".w1",
            Self::W2 => ".w2",
            Self::Full => "",
        }
    }
}

/// A register operand, e.g. `R3.w1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub index: u8,
    pub field: Field,
}

impl Register {
    pub fn new(index: u8, selector: u8) -> Self {
        Self {
            index: index & 0x1f,
            field: Field::from_selector(selector),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}{}", self.index, self.field.suffix())
    }
}

/// The data register of a burst transfer, addressed down to the start byte.
///
/// Byte 0 is the register itself and is written without a suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRegister {
    pub index: u8,
    pub byte: u8,
}

impl fmt::Display for ByteRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.byte {
            0 => write!(f, "R{}", self.index),
            byte => write!(f, "R{}.b{}", self.index, byte),
        }
    }
}

/// The second operand of most instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    Immediate(u16),
}

impl Operand {
    /// Pick the register or the immediate form depending on the IO bit.
    pub(crate) fn select(word: InstructionWord, immediate: u16) -> Self {
        if word.io() {
            Self::Immediate(immediate)
        } else {
            Self::Register(Register::new(word.rs2(), word.rs2_sel()))
        }
    }
}

/// How an immediate operand is written. This differs between instructions.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Radix {
    /// `0x05`
    Hex2,
    /// `0x0005`
    Hex4,
    /// `5`
    Decimal,
}

pub(crate) fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Operand, radix: Radix) -> fmt::Result {
    match (operand, radix) {
        (Operand::Register(register), _) => write!(f, "{register}"),
        (Operand::Immediate(value), Radix::Hex2) => write!(f, "0x{value:02x}"),
        (Operand::Immediate(value), Radix::Hex4) => write!(f, "0x{value:04x}"),
        (Operand::Immediate(value), Radix::Decimal) => write!(f, "{value}"),
    }
}

/// A seven bit transfer length.
///
/// Values up to 123 encode `length - 1`, the four values above select a byte
/// of R0 which holds the length at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferLength {
    Bytes(u8),
    R0Byte(u8),
    Invalid(u8),
}

impl TransferLength {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0..=123 => Self::Bytes(raw + 1),
            124..=127 => Self::R0Byte(raw - 124),
            _ => Self::Invalid(raw),
        }
    }
}

impl fmt::Display for TransferLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(length) => write!(f, "{length}"),
            Self::R0Byte(byte) => write!(f, "b{byte}"),
            Self::Invalid(_) => f.write_str("XX"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test_case(0x0000_0000, 0; "zero")]
    #[test_case(0x0000_0005, 5; "positive")]
    #[test_case(0x0200_00ff, 511; "largest positive")]
    #[test_case(0x0600_00fe, -2; "minus two")]
    #[test_case(0x0400_0000, -512; "most negative")]
    fn branch_offset_is_sign_extended(raw: u32, offset: i16) {
        assert_eq!(InstructionWord(raw).branch_offset(), offset);
    }

    #[test]
    fn burst_length_is_gathered() {
        // bits 27..25 -> 6..4, bits 15..13 -> 3..1, bit 7 -> 0
        let word = InstructionWord(0x0a00_a080);
        assert_eq!(word.burst_length(), (0b101 << 4) | (0b101 << 1) | 1);
    }

    #[test_case(0, "1")]
    #[test_case(123, "124")]
    #[test_case(124, "b0")]
    #[test_case(127, "b3")]
    #[test_case(128, "XX")]
    fn transfer_lengths(raw: u8, text: &str) {
        assert_eq!(TransferLength::from_raw(raw).to_string(), text);
    }

    #[test]
    fn full_register_has_no_suffix() {
        assert_eq!(Register::new(4, 7).to_string(), "R4");
        assert_eq!(Register::new(4, 6).to_string(), "R4.w2");
    }
}
