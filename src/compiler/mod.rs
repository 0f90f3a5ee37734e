pub mod compiler;

use bitflags::bitflags;
use thiserror::Error;

use crate::{bytecode::Bytecode, Optimizations};

pub use self::compiler::Compiler;

bitflags! {
    /// Optional rewrites applied while compiling, none of them change what a program does
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CompileFlags : u8 {
        /// Fold a run of identical `>`/`<`/`+`/`-` into one instruction
        const COALESCE_RUNS       = 0b0000_0001;
        /// Drop a loop that starts the program, cell 0 is always zero there
        const STRIP_COMMENT_BLOCK = 0b0000_0010;
    }
}

impl From<&Optimizations> for CompileFlags {
    fn from(optimization: &Optimizations) -> Self {
        match optimization {
            Optimizations::CoalesceRuns => CompileFlags::COALESCE_RUNS,
            Optimizations::CommentBlock => CompileFlags::STRIP_COMMENT_BLOCK,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Can't find `[` for the `]` at line {line:}, column {column:}")]
    UnmatchedClose {
        line: usize,
        column: usize,
        offset: usize,
    },

    #[error("Can't find `]` for the `[` at line {line:}, column {column:}")]
    UnmatchedOpen {
        line: usize,
        column: usize,
        offset: usize,
    },

    #[error("Loop closed at line {line:}, column {column:} spans {distance:} instructions, more than an operand can hold")]
    OperandOverflow {
        line: usize,
        column: usize,
        distance: usize,
    },
}

/// Compile `source` with the reference behaviour, one instruction per glyph
pub fn compile(source: &str) -> Result<Bytecode, CompileError> {
    Compiler::new(source, CompileFlags::empty()).compile()
}

pub fn compile_with(source: &str, flags: CompileFlags) -> Result<Bytecode, CompileError> {
    Compiler::new(source, flags).compile()
}
