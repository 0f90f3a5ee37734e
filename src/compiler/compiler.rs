use arbitrary_int::{u24, Number};

use crate::{
    bytecode::{Bytecode, Instruction},
    lexer::{lexer::Lexer, Token, TokenKind},
};

use super::{CompileError, CompileFlags};

/// Single pass compiler from source text to `Bytecode`.
///
/// Every `[` remembers where it was emitted, the matching `]` pops it and writes
/// the distance between the two into both instructions.  So at runtime either side
/// can find the other in O(1).
pub struct Compiler<'a> {
    lexer: Lexer<'a>,
    flags: CompileFlags,

    instructions: Vec<Instruction>,
    /// Index (into `instructions`) and token of every `[` that is still open
    pending_jumps: Vec<(usize, Token)>,
}

impl<'a> Compiler<'a> {
    pub fn new(source: &'a str, flags: CompileFlags) -> Compiler<'a> {
        Compiler {
            lexer: Lexer::new(source),
            flags,
            instructions: vec![],
            pending_jumps: vec![],
        }
    }

    pub fn compile(mut self) -> Result<Bytecode, CompileError> {
        while let Some(token) = self.lexer.next_instruction() {
            match token.kind {
                TokenKind::JumpStart => {
                    self.pending_jumps.push((self.instructions.len(), token.clone()));
                    // placeholder operand until we see the `]`
                    self.instructions.push(token.kind.to_instruction());
                }
                TokenKind::JumpEnd => self.close_loop(&token)?,
                _ => self.emit(&token),
            }
        }

        // report the innermost `[` that is still open
        if let Some((_, token)) = self.pending_jumps.pop() {
            return Err(CompileError::UnmatchedOpen {
                line: token.line,
                column: token.column,
                offset: token.offset,
            });
        }

        Ok(Bytecode::from_instructions(self.instructions))
    }

    fn close_loop(&mut self, token: &Token) -> Result<(), CompileError> {
        let (start, _) = self
            .pending_jumps
            .pop()
            .ok_or(CompileError::UnmatchedClose {
                line: token.line,
                column: token.column,
                offset: token.offset,
            })?;

        // the first cell is zero when the program starts so a leading loop never runs
        // any loop that follows a stripped one is in the same position again
        if start == 0 && self.flags.contains(CompileFlags::STRIP_COMMENT_BLOCK) {
            self.instructions.clear();
            return Ok(());
        }

        // i.e. `[]` is JumpForwardsIfZero(1) & JumpBackwardsIfNonZero(1)
        let distance = self.instructions.len() - start;
        if distance > u24::MAX.value() as usize {
            return Err(CompileError::OperandOverflow {
                line: token.line,
                column: token.column,
                distance,
            });
        }
        let operand = u24::new(distance as u32);

        self.instructions[start] = self.instructions[start].with_operand(operand);
        self.instructions
            .push(token.kind.to_instruction().with_operand(operand));

        Ok(())
    }

    fn emit(&mut self, token: &Token) {
        let instruction = token.kind.to_instruction();

        if self.flags.contains(CompileFlags::COALESCE_RUNS)
            && instruction.opcode().map_or(false, |op| op.is_repeatable())
        {
            if let Some(last) = self.instructions.last_mut() {
                let count = last.operand().value() + 1;
                // a full operand just starts a new run
                if last.raw_opcode() == instruction.raw_opcode() && count <= u24::MAX.value() {
                    *last = last.with_operand(u24::new(count));
                    return;
                }
            }
        }

        self.instructions.push(instruction);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bytecode::Opcode,
        compiler::{compile, compile_with},
    };

    use super::*;

    fn listing(bytecode: &Bytecode) -> Vec<(Opcode, u32)> {
        bytecode
            .iter()
            .map(|i| (i.opcode().unwrap(), i.operand().value()))
            .collect()
    }

    /// Checks every bracket pair sees the same distance from both sides
    fn assert_jumps_symmetric(bytecode: &Bytecode) {
        let mut open = vec![];
        for (ip, instruction) in bytecode.iter().enumerate() {
            if instruction.is_a(Opcode::JumpForwardsIfZero) {
                open.push(ip);
            } else if instruction.is_a(Opcode::JumpBackwardsIfNonZero) {
                let start = open.pop().expect("unbalanced bytecode");
                assert_eq!(ip - start, instruction.distance(), "`]` at {ip}");
                assert_eq!(ip - start, bytecode[start].distance(), "`[` at {start}");
            }
        }
        assert!(open.is_empty());
    }

    #[test]
    fn empty_source_is_just_eof() {
        let bytecode = compile("").unwrap();

        assert_eq!(listing(&bytecode), vec![(Opcode::Eof, 0)]);
    }

    #[test]
    fn comments_compile_to_nothing() {
        let bytecode = compile("this is a comment\n with no instructions").unwrap();

        assert_eq!(bytecode.len(), 1);
    }

    #[test]
    fn one_instruction_per_glyph() {
        let bytecode = compile("+ + > < - . ,").unwrap();

        assert_eq!(
            listing(&bytecode),
            vec![
                (Opcode::MemInc, 1),
                (Opcode::MemInc, 1),
                (Opcode::PtrInc, 1),
                (Opcode::PtrDec, 1),
                (Opcode::MemDec, 1),
                (Opcode::Write, 0),
                (Opcode::Read, 0),
                (Opcode::Eof, 0),
            ]
        );
    }

    #[test]
    fn adjacent_brackets_have_distance_one() {
        let bytecode = compile("[]").unwrap();

        assert_eq!(
            listing(&bytecode),
            vec![
                (Opcode::JumpForwardsIfZero, 1),
                (Opcode::JumpBackwardsIfNonZero, 1),
                (Opcode::Eof, 0),
            ]
        );
    }

    #[test]
    fn loop_distance_counts_the_body() {
        let bytecode = compile("+++++[-]").unwrap();

        assert_eq!(bytecode[5].opcode(), Some(Opcode::JumpForwardsIfZero));
        assert_eq!(bytecode[5].distance(), 2);
        assert_eq!(bytecode[7].opcode(), Some(Opcode::JumpBackwardsIfNonZero));
        assert_eq!(bytecode[7].distance(), 2);
    }

    #[test]
    fn nested_loops_are_symmetric() {
        for source in [
            "[[]]",
            "[[-]<]",
            ">+++++>++++>+++>++>+[[-]<]",
            "+[>+[>+[-]<-]<-]",
            "[][][[][[]]]",
            "+++>++<[->+>+<<]>>[-<<+>>]",
        ] {
            assert_jumps_symmetric(&compile(source).unwrap());
        }
    }

    #[test]
    fn unmatched_close_is_an_error() {
        assert_eq!(
            compile("]"),
            Err(CompileError::UnmatchedClose {
                line: 1,
                column: 1,
                offset: 0
            })
        );
    }

    #[test]
    fn improperly_ordered_brackets_are_an_error() {
        assert_eq!(
            compile("+\n][").unwrap_err(),
            CompileError::UnmatchedClose {
                line: 2,
                column: 1,
                offset: 2
            }
        );
    }

    #[test]
    fn unmatched_open_reports_innermost_bracket() {
        assert_eq!(
            compile("[ [] [").unwrap_err(),
            CompileError::UnmatchedOpen {
                line: 1,
                column: 6,
                offset: 5
            }
        );
    }

    #[test]
    fn balanced_counts_in_wrong_order_fail() {
        assert!(compile("][").is_err());
        assert!(compile("[]][[]").is_err());
        assert!(compile("[[]").is_err());
        assert!(compile("[[]]").is_ok());
    }

    #[test]
    fn loops_wider_than_an_operand_are_rejected() {
        let body = "+".repeat((1 << 24) - 2);

        let bytecode = compile(&format!("[{body}]")).unwrap();
        assert_eq!(bytecode[0].distance(), 0xFF_FFFF);
        assert_eq!(bytecode[0xFF_FFFF].distance(), 0xFF_FFFF);

        assert_eq!(
            compile(&format!("[{body}+]")).unwrap_err(),
            CompileError::OperandOverflow {
                line: 1,
                column: (1 << 24) + 1,
                distance: 1 << 24
            }
        );
    }

    #[test]
    fn coalescing_folds_runs() {
        let bytecode = compile_with("+++>>--<.", CompileFlags::COALESCE_RUNS).unwrap();

        assert_eq!(
            listing(&bytecode),
            vec![
                (Opcode::MemInc, 3),
                (Opcode::PtrInc, 2),
                (Opcode::MemDec, 2),
                (Opcode::PtrDec, 1),
                (Opcode::Write, 0),
                (Opcode::Eof, 0),
            ]
        );
    }

    #[test]
    fn coalescing_never_merges_io_or_across_brackets() {
        let bytecode = compile_with("..++[+]+", CompileFlags::COALESCE_RUNS).unwrap();

        assert_eq!(
            listing(&bytecode),
            vec![
                (Opcode::Write, 0),
                (Opcode::Write, 0),
                (Opcode::MemInc, 2),
                (Opcode::JumpForwardsIfZero, 2),
                (Opcode::MemInc, 1),
                (Opcode::JumpBackwardsIfNonZero, 2),
                (Opcode::MemInc, 1),
                (Opcode::Eof, 0),
            ]
        );
    }

    #[test]
    fn strips_leading_comment_blocks() {
        let bytecode = compile_with(
            "[this is a comment, with glyphs. +-][another]+",
            CompileFlags::STRIP_COMMENT_BLOCK,
        )
        .unwrap();

        assert_eq!(listing(&bytecode), vec![(Opcode::MemInc, 1), (Opcode::Eof, 0)]);
    }

    #[test]
    fn keeps_loops_that_can_run() {
        let bytecode = compile_with("+[-]", CompileFlags::STRIP_COMMENT_BLOCK).unwrap();

        assert_eq!(bytecode.len(), 5);
        assert_jumps_symmetric(&bytecode);
    }

    #[test]
    fn stripping_still_checks_balance() {
        assert!(compile_with("[[]", CompileFlags::STRIP_COMMENT_BLOCK).is_err());
        assert!(compile_with("[]]", CompileFlags::STRIP_COMMENT_BLOCK).is_err());
    }

    #[test]
    fn all_optimizations_keep_jumps_symmetric() {
        let bytecode = compile_with(
            "[comment]>>+++[->>++<<]<<---[[-]>>]",
            CompileFlags::all(),
        )
        .unwrap();

        assert_jumps_symmetric(&bytecode);
        assert_eq!(bytecode[0].opcode(), Some(Opcode::PtrInc));
        assert_eq!(bytecode[0].distance(), 2);
    }
}
