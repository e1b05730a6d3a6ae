//! Decoding of PRU instruction words.
//!
//! [`Instruction::decode`] turns any 32-bit word into an [`Instruction`].
//! Decoding never fails: words which don't encode a known instruction decode
//! to one of the `Unknown*` variants or [`Instruction::UnsupportedMove`],
//! which render as an `UNKNOWN` line carrying the raw word. The [`Display`](std::fmt::Display)
//! implementation produces the assembler-like text shown by the debugger.

mod fields;

pub use fields::{ByteRegister, Field, InstructionWord, Operand, Register, TransferLength};

use fields::{write_operand, Radix};
use std::fmt;

/// The `HALT` instruction. Writing it to instruction memory sets a breakpoint.
pub const HALT: u32 = 0x2a00_0000;

/// Decode `word` and render it as text.
pub fn disassemble(word: u32) -> String {
    Instruction::decode(word).to_string()
}

/// Operations of the ALU format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum AluOp {
    /// ADD
    Add,
    /// ADC
    Adc,
    /// SUB
    Sub,
    /// SUC
    Suc,
    /// LSL
    Lsl,
    /// LSR
    Lsr,
    /// RSB
    Rsb,
    /// RSC
    Rsc,
    /// AND
    And,
    /// OR
    Or,
    /// XOR
    Xor,
    /// NOT
    Not,
    /// MIN
    Min,
    /// MAX
    Max,
    /// CLR
    Clr,
    /// SET
    Set,
}

impl AluOp {
    fn from_bits(bits: u8) -> Self {
        const OPS: [AluOp; 16] = [
            AluOp::Add,
            AluOp::Adc,
            AluOp::Sub,
            AluOp::Suc,
            AluOp::Lsl,
            AluOp::Lsr,
            AluOp::Rsb,
            AluOp::Rsc,
            AluOp::And,
            AluOp::Or,
            AluOp::Xor,
            AluOp::Not,
            AluOp::Min,
            AluOp::Max,
            AluOp::Clr,
            AluOp::Set,
        ];
        OPS[usize::from(bits & 0xf)]
    }
}

/// Conditions of the quick arithmetic branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticTest {
    /// Test code 0, which has no mnemonic.
    Reserved,
    Lt,
    Eq,
    Le,
    Gt,
    Ne,
    Ge,
    /// Branch always, `QBA`.
    Always,
}

impl ArithmeticTest {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x7 {
            0 => Self::Reserved,
            1 => Self::Lt,
            2 => Self::Eq,
            3 => Self::Le,
            4 => Self::Gt,
            5 => Self::Ne,
            6 => Self::Ge,
            _ => Self::Always,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Reserved => "xx",
            Self::Lt => "LT",
            Self::Eq => "EQ",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ne => "NE",
            Self::Ge => "GE",
            Self::Always => "A",
        }
    }
}

/// Conditions of the quick bit branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitTest {
    /// Branch if the bit is clear.
    Clear,
    /// Branch if the bit is set.
    Set,
    /// Test codes 0 and 3.
    Reserved(u8),
}

impl BitTest {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            1 => Self::Clear,
            2 => Self::Set,
            other => Self::Reserved(other),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Clear => "BC",
            Self::Set => "BS",
            Self::Reserved(_) => "xx",
        }
    }
}

/// The four burst transfer instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum BurstKind {
    /// SBBO
    StoreToAddress,
    /// LBBO
    LoadFromAddress,
    /// SBCO
    StoreToConstant,
    /// LBCO
    LoadFromConstant,
}

/// Where the base address of a burst transfer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstBase {
    /// A full register, `R1`.
    Register(u8),
    /// An entry of the constants table, `C4`.
    Constant(u8),
}

impl fmt::Display for BurstBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register(index) => write!(f, "R{index}"),
            Self::Constant(index) => write!(f, "C{index}"),
        }
    }
}

/// Crossbar transfers to and from the broadside devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum TransferOp {
    /// XIN
    In,
    /// XOUT
    Out,
    /// XCHG
    Exchange,
}

/// Access width of a register indirect move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum MoveWidth {
    /// B
    Byte,
    /// W
    Word,
    /// D
    DoubleWord,
}

/// Addressing mode of one side of a register indirect move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndirectMode {
    Plain,
    PostIncrement,
    PreDecrement,
}

/// A register pointer operand of `MVI`, e.g. `*--R1.b0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indirect {
    pub register: Register,
    pub mode: IndirectMode,
}

impl fmt::Display for Indirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            IndirectMode::Plain => write!(f, "*{}", self.register),
            IndirectMode::PostIncrement => write!(f, "*{}++", self.register),
            IndirectMode::PreDecrement => write!(f, "*--{}", self.register),
        }
    }
}

/// Why an `MVI` encoding is not decoded.
///
/// When several apply, the one with the highest code is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// One side uses the reserved addressing mode 0.
    ReservedMode = 1,
    /// Three operand forms are not supported.
    ThreeOperand = 2,
    /// Width 3 is reserved.
    ReservedWidth = 3,
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Alu {
        op: AluOp,
        dst: Register,
        src: Register,
        operand: Operand,
    },
    Jmp {
        target: Operand,
    },
    Jal {
        link: Register,
        target: Operand,
    },
    Ldi {
        dst: Register,
        value: u16,
    },
    Lmbd {
        dst: Register,
        src: Register,
        operand: Operand,
    },
    Scan {
        dst: Register,
        operand: Operand,
    },
    Halt,
    Mvi {
        width: MoveWidth,
        dst: Indirect,
        src: Indirect,
    },
    Transfer {
        op: TransferOp,
        device: u8,
        register: Register,
        length: TransferLength,
    },
    Loop {
        indexed: bool,
        end: u8,
        count: Operand,
    },
    Slp {
        wake_on_event: bool,
    },
    /// `QBA`, the unconditional quick branch.
    QuickBranchAlways {
        offset: i16,
    },
    QuickBranch {
        test: ArithmeticTest,
        offset: i16,
        lhs: Register,
        rhs: Operand,
    },
    QuickBitBranch {
        test: BitTest,
        offset: i16,
        register: Register,
        bit: Operand,
    },
    Burst {
        kind: BurstKind,
        data: ByteRegister,
        base: BurstBase,
        offset: Operand,
        length: TransferLength,
    },
    /// An `MVI` encoding which is not decoded.
    UnsupportedMove {
        word: u32,
        error: MoveError,
    },
    /// A crossbar encoding which is neither XIN, XOUT nor XCHG.
    UnknownTransfer {
        word: u32,
    },
    /// An unknown sub-operation of the control format.
    UnknownControl {
        word: u32,
        sub_op: u8,
    },
    /// A word of an unknown format.
    Unknown {
        word: u32,
    },
}

impl Instruction {
    /// Decode an instruction word.
    pub fn decode(word: u32) -> Self {
        let word = InstructionWord(word);
        match word.format() {
            0 => Self::decode_alu(word),
            1 => Self::decode_control(word),
            2 | 3 => Self::decode_quick_branch(word),
            4 | 7 => Self::decode_burst(word),
            6 => Self::decode_bit_branch(word),
            _ => Self::Unknown { word: word.raw() },
        }
    }

    /// Is this the `HALT` instruction.
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt)
    }

    fn decode_alu(word: InstructionWord) -> Self {
        Self::Alu {
            op: AluOp::from_bits(word.op()),
            dst: Register::new(word.rd(), word.rd_sel()),
            src: Register::new(word.rs1(), word.rs1_sel()),
            operand: Operand::select(word, word.imm8().into()),
        }
    }

    fn decode_control(word: InstructionWord) -> Self {
        let dst = Register::new(word.rd(), word.rd_sel());
        let src = Register::new(word.rs1(), word.rs1_sel());

        match word.op() {
            0 => Self::Jmp {
                target: Operand::select(word, word.imm16()),
            },
            1 => Self::Jal {
                link: dst,
                target: Operand::select(word, word.imm16()),
            },
            2 => Self::Ldi {
                dst,
                value: word.imm16(),
            },
            3 => Self::Lmbd {
                dst,
                src,
                operand: Operand::select(word, word.imm8().into()),
            },
            4 => Self::Scan {
                dst,
                operand: Operand::select(word, word.imm8().into()),
            },
            5 => Self::Halt,
            6 => Self::decode_mvi(word),
            7 => Self::decode_transfer(word),
            8 => Self::Loop {
                indexed: word.indexed_loop(),
                end: word.branch_low(),
                count: Operand::select(word, word.imm8().into()),
            },
            15 => Self::Slp {
                wake_on_event: word.wake_on_event(),
            },
            sub_op => Self::UnknownControl {
                word: word.raw(),
                sub_op,
            },
        }
    }

    fn decode_mvi(word: InstructionWord) -> Self {
        fn mode(bits: u8) -> Option<IndirectMode> {
            match bits {
                1 => Some(IndirectMode::Plain),
                2 => Some(IndirectMode::PostIncrement),
                3 => Some(IndirectMode::PreDecrement),
                _ => None,
            }
        }

        let width = match word.mvi_width() {
            0 => Some(MoveWidth::Byte),
            1 => Some(MoveWidth::Word),
            2 => Some(MoveWidth::DoubleWord),
            _ => None,
        };
        let dst_mode = mode(word.mvi_dst_mode());
        let src_mode = mode(word.mvi_src_mode());

        let error = if width.is_none() {
            Some(MoveError::ReservedWidth)
        } else if word.mvi_three_operand() {
            Some(MoveError::ThreeOperand)
        } else if dst_mode.is_none() || src_mode.is_none() {
            Some(MoveError::ReservedMode)
        } else {
            None
        };

        match (error, width, dst_mode, src_mode) {
            (None, Some(width), Some(dst_mode), Some(src_mode)) => Self::Mvi {
                width,
                dst: Indirect {
                    register: Register::new(word.rd(), word.rd_sel()),
                    mode: dst_mode,
                },
                src: Indirect {
                    register: Register::new(word.rs1(), word.rs1_sel()),
                    mode: src_mode,
                },
            },
            (error, ..) => Self::UnsupportedMove {
                word: word.raw(),
                error: error.unwrap_or(MoveError::ReservedMode),
            },
        }
    }

    fn decode_transfer(word: InstructionWord) -> Self {
        let op = match word.xfr_op() & 0x5f {
            0x5d => TransferOp::In,
            0x5e => TransferOp::Out,
            0x5f => TransferOp::Exchange,
            _ => return Self::UnknownTransfer { word: word.raw() },
        };

        Self::Transfer {
            op,
            device: word.xfr_device(),
            register: Register::new(word.rd(), word.xfr_byte()),
            length: TransferLength::from_raw(word.xfr_length()),
        }
    }

    fn decode_quick_branch(word: InstructionWord) -> Self {
        let offset = word.branch_offset();
        match ArithmeticTest::from_bits(word.arith_test()) {
            ArithmeticTest::Always => Self::QuickBranchAlways { offset },
            test => Self::QuickBranch {
                test,
                offset,
                lhs: Register::new(word.rs1(), word.rs1_sel()),
                rhs: Operand::select(word, word.imm8().into()),
            },
        }
    }

    fn decode_bit_branch(word: InstructionWord) -> Self {
        Self::QuickBitBranch {
            test: BitTest::from_bits(word.bit_test()),
            offset: word.branch_offset(),
            register: Register::new(word.rs1(), word.rs1_sel()),
            bit: Operand::select(word, word.bit_number().into()),
        }
    }

    fn decode_burst(word: InstructionWord) -> Self {
        let (kind, base) = match (word.format(), word.load()) {
            (7, false) => (BurstKind::StoreToAddress, BurstBase::Register(word.rs1())),
            (7, true) => (BurstKind::LoadFromAddress, BurstBase::Register(word.rs1())),
            (_, false) => (BurstKind::StoreToConstant, BurstBase::Constant(word.rs1())),
            (_, true) => (BurstKind::LoadFromConstant, BurstBase::Constant(word.rs1())),
        };

        Self::Burst {
            kind,
            data: ByteRegister {
                index: word.rd(),
                byte: word.data_byte(),
            },
            base,
            offset: Operand::select(word, word.imm8().into()),
            length: TransferLength::from_raw(word.burst_length()),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alu {
                op,
                dst,
                src,
                operand,
            } => {
                write!(f, "{op} {dst}, {src}, ")?;
                write_operand(f, operand, Radix::Hex2)
            }
            Self::Jmp { target } => {
                f.write_str("JMP ")?;
                write_operand(f, target, Radix::Hex4)
            }
            Self::Jal { link, target } => {
                write!(f, "JAL {link}, ")?;
                write_operand(f, target, Radix::Hex4)
            }
            Self::Ldi { dst, value } => write!(f, "LDI {dst}, 0x{value:04x}"),
            Self::Lmbd { dst, src, operand } => {
                write!(f, "LMBD {dst}, {src}, ")?;
                write_operand(f, operand, Radix::Hex4)
            }
            Self::Scan { dst, operand } => {
                write!(f, "SCAN {dst}, ")?;
                write_operand(f, operand, Radix::Hex4)
            }
            Self::Halt => f.write_str("HALT"),
            Self::Mvi { width, dst, src } => write!(f, "MVI{width} {dst}, {src}"),
            Self::Transfer {
                op,
                device,
                register,
                length,
            } => write!(f, "{op} {device}, &{register}, {length}"),
            Self::Loop {
                indexed,
                end,
                count,
            } => {
                let prefix = if *indexed { "I" } else { "" };
                write!(f, "{prefix}LOOP {end}, ")?;
                write_operand(f, count, Radix::Hex4)
            }
            Self::Slp { wake_on_event } => write!(f, "SLP {}", u8::from(*wake_on_event)),
            Self::QuickBranchAlways { offset } => write!(f, "QBA {offset}"),
            Self::QuickBranch {
                test,
                offset,
                lhs,
                rhs,
            } => {
                write!(f, "QB{} {offset}, {lhs}, ", test.suffix())?;
                write_operand(f, rhs, Radix::Decimal)
            }
            Self::QuickBitBranch {
                test,
                offset,
                register,
                bit,
            } => {
                write!(f, "QB{} {offset}, {register}, ", test.suffix())?;
                write_operand(f, bit, Radix::Decimal)
            }
            Self::Burst {
                kind,
                data,
                base,
                offset,
                length,
            } => {
                write!(f, "{kind} &{data}, {base}, ")?;
                write_operand(f, offset, Radix::Decimal)?;
                write!(f, ", {length}")
            }
            Self::UnsupportedMove { word, error } => {
                write!(f, "UNKNOWN MVIx: {word:#x} err: {}", *error as u8)
            }
            Self::UnknownTransfer { word } => write!(f, "UNKNOWN-XI/XOUT: {word:#x}"),
            Self::UnknownControl { word, sub_op } => {
                write!(f, "UNKNOWN-F2 {word:#x} {sub_op:#x}")
            }
            Self::Unknown { word } => write!(f, "UNKNOWN {word:#x}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(0x0000_0000, "ADD R0.b0, R0.b0, R0.b0"; "all zero word")]
    #[test_case(0x0105_e1e2, "ADD R2, R1, 0x05"; "add immediate")]
    #[test_case(0x1703_e4e4, "NOT R4, R4, 0x03"; "not immediate")]
    #[test_case(0x2a00_0000, "HALT"; "halt")]
    #[test_case(0x2412_34e1, "LDI R1, 0x1234"; "ldi")]
    #[test_case(0x2100_4000, "JMP 0x0040"; "jmp immediate")]
    #[test_case(0x20e3_0000, "JMP R3"; "jmp register")]
    #[test_case(0x2300_10fe, "JAL R30, 0x0010"; "jal immediate")]
    #[test_case(0x2701_e2e1, "LMBD R1, R2, 0x0001"; "lmbd immediate")]
    #[test_case(0x28e3_0081, "SCAN R1.w0, R3"; "scan register")]
    #[test_case(0x3105_0004, "LOOP 4, 0x0005"; "loop immediate")]
    #[test_case(0x30e2_8010, "ILOOP 16, R2"; "iloop register")]
    #[test_case(0x3e80_0000, "SLP 1"; "sleep with wake")]
    #[test_case(0x3200_0000, "UNKNOWN-F2 0x32000000 0x9"; "unknown control")]
    #[test_case(0xa000_0000, "UNKNOWN 0xa0000000"; "unknown format")]
    fn decodes(word: u32, text: &str) {
        assert_eq!(disassemble(word), text);
    }

    #[test_case(0x7e00_00fe, "QBA -2"; "branch always backwards")]
    #[test_case(0x5105_e104, "QBEQ 4, R1, 5"; "branch equal immediate")]
    #[test_case(0x4882_0108, "QBLT 8, R1.b0, R2.w0"; "branch less register")]
    #[test_case(0xd103_e403, "QBBS 3, R4, 3"; "branch bit set")]
    #[test_case(0xcee5_e3ff, "QBBC -1, R3, R5"; "branch bit clear register")]
    fn decodes_branches(word: u32, text: &str) {
        assert_eq!(disassemble(word), text);
    }

    #[test_case(0xe108_2182, "SBBO &R2, R1, 8, 4"; "store immediate offset")]
    #[test_case(0x9ea3_c420, "LBCO &R0.b1, C4, R3.w1, b0"; "load constant register offset")]
    fn decodes_bursts(word: u32, text: &str) {
        assert_eq!(disassemble(word), text);
    }

    #[test_case(0x2f05_018e, "XOUT 10, &R14.b0, 4"; "xout")]
    #[test_case(0x2e00_0000, "UNKNOWN-XI/XOUT: 0x2e000000"; "reserved transfer")]
    fn decodes_transfers(word: u32, text: &str) {
        assert_eq!(disassemble(word), text);
    }

    #[test_case(0x2d20_0201, "MVIB *R1.b0++, *R2.b0"; "post increment")]
    #[test_case(0x2dc0_0201, "MVIB *--R1.b0, *R2.b0++"; "pre decrement")]
    #[test_case(0x2c00_0201, "UNKNOWN MVIx: 0x2c000201 err: 1"; "reserved mode")]
    #[test_case(0x2d30_0201, "UNKNOWN MVIx: 0x2d300201 err: 2"; "three operands")]
    #[test_case(0x2c13_0201, "UNKNOWN MVIx: 0x2c130201 err: 3"; "reserved width wins")]
    fn decodes_moves(word: u32, text: &str) {
        assert_eq!(disassemble(word), text);
    }

    #[test]
    fn halt_is_recognised() {
        assert!(Instruction::decode(HALT).is_halt());
        assert!(!Instruction::decode(0).is_halt());
    }

    proptest! {
        #[test]
        fn every_word_decodes(word in any::<u32>()) {
            let text = disassemble(word);
            prop_assert!(!text.is_empty());
        }

        #[test]
        fn unknown_formats_carry_the_word(low in 0u32..0x2000_0000) {
            let word = 0xa000_0000 | low;
            prop_assert_eq!(disassemble(word), format!("UNKNOWN {word:#x}"));
        }
    }
}
