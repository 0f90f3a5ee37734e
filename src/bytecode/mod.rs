pub mod bytecode;

use std::fmt;

use arbitrary_int::u24;
use bitbybit::{bitenum, bitfield};

pub use self::bytecode::Bytecode;

/// The operation half of an `Instruction`.
///
/// Byte value 8 is unassigned, decoding it yields no opcode.
#[bitenum(u8, exhaustive: false)]
#[derive(Debug, PartialEq, Eq)]
pub enum Opcode {
    /// End of the program, always the last instruction
    Eof = 0,
    /// Does nothing
    Nop = 1,
    /// `>`: move the data pointer right by the operand
    PtrInc = 2,
    /// `<`: move the data pointer left by the operand
    PtrDec = 3,
    /// `+`: add the operand to the cell at the data pointer
    MemInc = 4,
    /// `-`: subtract the operand from the cell at the data pointer
    MemDec = 5,
    /// `,`: read one byte into the cell at the data pointer
    Read = 6,
    /// `.`: write the cell at the data pointer
    Write = 7,
    /// `[`: skip past the matching `]` if the cell is zero
    JumpForwardsIfZero = 9,
    /// `]`: go back to the matching `[` if the cell is non-zero
    JumpBackwardsIfNonZero = 10,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Eof => "EOF",
            Opcode::Nop => "NOP",
            Opcode::PtrInc => "PTR_INC",
            Opcode::PtrDec => "PTR_DEC",
            Opcode::MemInc => "MEM_INC",
            Opcode::MemDec => "MEM_DEC",
            Opcode::Read => "READ",
            Opcode::Write => "WRITE",
            Opcode::JumpForwardsIfZero => "JMP_FWD",
            Opcode::JumpBackwardsIfNonZero => "JMP_BAC",
        }
    }

    /// Opcodes whose operand is a repeat count
    pub fn is_repeatable(&self) -> bool {
        matches!(
            self,
            Opcode::PtrInc | Opcode::PtrDec | Opcode::MemInc | Opcode::MemDec
        )
    }

    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Opcode::JumpForwardsIfZero | Opcode::JumpBackwardsIfNonZero
        )
    }
}

/// A single compiled instruction packed into one word.
///
/// Structure is: Operand (24 bits) | Opcode (8 bits)
///
/// The operand is a repeat count for `>`/`<`/`+`/`-`, the distance to the
/// matching bracket for jumps, and zero for everything else.
#[bitfield(u32)]
#[derive(Debug, PartialEq, Eq)]
pub struct Instruction {
    #[bits(8..=31, rw)]
    pub operand: u24,

    #[bits(0..=7, rw)]
    code: u8,
}

impl Instruction {
    pub const EOF: Instruction = Instruction::new_with_raw_value(0);

    pub fn new(opcode: Opcode, operand: u24) -> Instruction {
        Instruction::new_with_raw_value(0)
            .with_code(opcode.raw_value())
            .with_operand(operand)
    }

    /// Convenience for small operands, panics if `operand` doesn't fit in 24 bits
    pub fn from_parts(opcode: Opcode, operand: u32) -> Instruction {
        Instruction::new(opcode, u24::new(operand))
    }

    /// `None` if the opcode byte isn't an assigned opcode
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::new_with_raw_value(self.code()).ok()
    }

    pub fn raw_opcode(&self) -> u8 {
        self.code()
    }

    pub fn is_a(&self, opcode: Opcode) -> bool {
        self.code() == opcode.raw_value()
    }

    /// The operand widened for pointer arithmetic
    pub fn distance(&self) -> usize {
        self.operand().value() as usize
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Some(opcode) if opcode.is_repeatable() || opcode.is_jump() => {
                write!(f, "{} {}", opcode.mnemonic(), self.operand().value())
            }
            Some(opcode) => write!(f, "{}", opcode.mnemonic()),
            None => write!(f, "?? {:#010x}", self.raw_value()),
        }
    }
}
