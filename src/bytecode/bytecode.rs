use std::{fmt, ops::Index, slice};

use num_traits::ops::bytes::ToBytes;

use super::Instruction;

/// A compiled program, always terminated by a single `EOF`.
///
/// Only the compiler builds these so once created they are never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bytecode {
    instructions: Vec<Instruction>,
}

impl Bytecode {
    /// Appends the trailing `EOF`, callers hand over everything before it
    pub(crate) fn from_instructions(mut instructions: Vec<Instruction>) -> Bytecode {
        instructions.push(Instruction::EOF);
        Bytecode { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn get(&self, ip: usize) -> Option<Instruction> {
        self.instructions.get(ip).copied()
    }

    pub fn iter(&self) -> slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Every word in little endian order, 4 bytes per instruction
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.instructions.len() * 4);
        for instruction in self.instructions.iter() {
            bytes.extend_from_slice(&ToBytes::to_le_bytes(&instruction.raw_value()));
        }
        bytes
    }
}

impl Index<usize> for Bytecode {
    type Output = Instruction;

    fn index(&self, ip: usize) -> &Instruction {
        &self.instructions[ip]
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad the index column to the widest index
        let width = self.len().to_string().len();
        for (ip, instruction) in self.iter().enumerate() {
            writeln!(f, "{:>width$}: {}", ip, instruction, width = width)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Opcode;

    #[test]
    fn always_ends_in_eof() {
        let bytecode = Bytecode::from_instructions(vec![]);

        assert_eq!(bytecode.len(), 1);
        assert!(bytecode[0].is_a(Opcode::Eof));
    }

    #[test]
    fn serializes_words_little_endian() {
        let bytecode =
            Bytecode::from_instructions(vec![Instruction::from_parts(Opcode::MemInc, 0x0102)]);

        assert_eq!(bytecode.to_le_bytes(), vec![0x04, 0x02, 0x01, 0x00, 0, 0, 0, 0]);
    }

    #[test]
    fn display_lists_one_instruction_per_line() {
        let bytecode = Bytecode::from_instructions(vec![
            Instruction::from_parts(Opcode::JumpForwardsIfZero, 1),
            Instruction::from_parts(Opcode::JumpBackwardsIfNonZero, 1),
        ]);

        assert_eq!(bytecode.to_string(), "0: JMP_FWD 1\n1: JMP_BAC 1\n2: EOF\n");
    }
}
