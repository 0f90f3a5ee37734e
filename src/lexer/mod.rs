pub mod lexer;

use crate::bytecode::{Instruction, Opcode};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // `>`: Increment the `data pointer` by one
    Increment,
    // `<`: Decrement the `data pointer` by one
    Decrement,

    // `+`: Increment the byte at the `data pointer` by one
    DerefIncrement,
    // `-`: Decrement the byte at the `data pointer` by one
    DerefDecrement,

    // `.`: Write the byte at the `data pointer` to the `output device`
    Write,
    // `,`: Read the next byte from the `input device` and write it to the `data pointer`
    Read,

    // `[`: If the byte at the `data pointer` is zero, then jump the `instruction pointer` forward to the instruction after the matching `]`
    JumpStart,
    // `]`: If the byte at the `data pointer` is non-zero then jump the `instruction pointer` back to the matching `[`
    JumpEnd,

    // Comment every other character
    Comment(String),
}

/// A token along with where it started in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl TokenKind {
    pub fn from_glyph(c: char) -> Option<TokenKind> {
        match c {
            '>' => Some(TokenKind::Increment),
            '<' => Some(TokenKind::Decrement),
            '+' => Some(TokenKind::DerefIncrement),
            '-' => Some(TokenKind::DerefDecrement),
            '.' => Some(TokenKind::Write),
            ',' => Some(TokenKind::Read),
            '[' => Some(TokenKind::JumpStart),
            ']' => Some(TokenKind::JumpEnd),
            _ => None,
        }
    }

    pub fn glyph(&self) -> Option<char> {
        match self {
            TokenKind::Increment => Some('>'),
            TokenKind::Decrement => Some('<'),
            TokenKind::DerefIncrement => Some('+'),
            TokenKind::DerefDecrement => Some('-'),
            TokenKind::Write => Some('.'),
            TokenKind::Read => Some(','),
            TokenKind::JumpStart => Some('['),
            TokenKind::JumpEnd => Some(']'),
            TokenKind::Comment(_) => None,
        }
    }

    /// The freshly compiled instruction for this token, `NOP` for comments
    pub fn to_instruction(&self) -> Instruction {
        self.glyph()
            .map_or(Instruction::from_parts(Opcode::Nop, 0), to_instruction)
    }
}

/// Is `c` one of the eight instruction glyphs `> < + - . , [ ]`?
pub fn is_instruction(c: char) -> bool {
    TokenKind::from_glyph(c).is_some()
}

/// Maps a glyph to its instruction, anything else becomes a `NOP`
pub fn to_instruction(c: char) -> Instruction {
    match c {
        '>' => Instruction::from_parts(Opcode::PtrInc, 1),
        '<' => Instruction::from_parts(Opcode::PtrDec, 1),
        '+' => Instruction::from_parts(Opcode::MemInc, 1),
        '-' => Instruction::from_parts(Opcode::MemDec, 1),
        '.' => Instruction::from_parts(Opcode::Write, 0),
        ',' => Instruction::from_parts(Opcode::Read, 0),
        // operands are patched in once the matching bracket is found
        '[' => Instruction::from_parts(Opcode::JumpForwardsIfZero, 0),
        ']' => Instruction::from_parts(Opcode::JumpBackwardsIfNonZero, 0),
        _ => Instruction::from_parts(Opcode::Nop, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLYPHS: [char; 8] = ['>', '<', '+', '-', '.', ',', '[', ']'];

    #[test]
    fn accepts_exactly_the_eight_glyphs() {
        for c in GLYPHS {
            assert!(is_instruction(c), "{c:?} should be an instruction");
        }
        for c in ['a', ' ', '\n', '\t', '#', '0', '\0', '{', 'é'] {
            assert!(!is_instruction(c), "{c:?} should not be an instruction");
        }
    }

    #[test]
    fn classifier_and_converter_agree() {
        for c in (0u8..=127).map(char::from).chain(['λ', '→']) {
            let is_nop = to_instruction(c).is_a(Opcode::Nop);
            assert_eq!(is_instruction(c), !is_nop, "disagreement on {c:?}");
        }
    }

    #[test]
    fn maps_glyphs_to_opcodes_and_operands() {
        let expected = [
            ('>', Opcode::PtrInc, 1),
            ('<', Opcode::PtrDec, 1),
            ('+', Opcode::MemInc, 1),
            ('-', Opcode::MemDec, 1),
            ('.', Opcode::Write, 0),
            (',', Opcode::Read, 0),
            ('[', Opcode::JumpForwardsIfZero, 0),
            (']', Opcode::JumpBackwardsIfNonZero, 0),
        ];

        for (c, opcode, operand) in expected {
            let instruction = to_instruction(c);
            assert_eq!(instruction.opcode(), Some(opcode), "opcode of {c:?}");
            assert_eq!(instruction.operand().value(), operand, "operand of {c:?}");
        }
    }

    #[test]
    fn glyph_round_trips_through_token_kind() {
        for c in GLYPHS {
            assert_eq!(TokenKind::from_glyph(c).and_then(|kind| kind.glyph()), Some(c));
        }
    }
}
