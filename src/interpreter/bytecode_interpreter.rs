use crate::bytecode::{Bytecode, Instruction, Opcode};

use super::{Fault, FaultKind, Runtime};

/// How a taken jump finds its matching bracket.
///
/// Both land on the same instruction for anything the compiler produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JumpStrategy {
    /// Use the distance stored in the operand, O(1)
    #[default]
    Distance,
    /// Walk the bytecode counting nested brackets
    Scan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halt,
}

pub struct ByteCodeInterpreter {
    /// Index of the instruction to execute next
    ip: usize,
    strategy: JumpStrategy,

    steps: u64,
    step_limit: Option<u64>,
}

impl ByteCodeInterpreter {
    pub fn new(strategy: JumpStrategy) -> Self {
        Self {
            ip: 0,
            strategy,
            steps: 0,
            step_limit: None,
        }
    }

    pub fn set_strategy(&mut self, strategy: JumpStrategy) {
        self.strategy = strategy;
    }

    pub fn set_step_limit(&mut self, step_limit: Option<u64>) {
        self.step_limit = step_limit;
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Instructions executed so far, `EOF` isn't counted
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn reset(&mut self) {
        self.ip = 0;
        self.steps = 0;
    }

    /// Runs until `EOF` or the first fault
    pub fn run(&mut self, runtime: &mut Runtime, bytecode: &Bytecode) -> Result<(), Fault> {
        while self.step(runtime, bytecode)? == Step::Continue {}
        Ok(())
    }

    /// Executes the instruction under the instruction pointer.
    ///
    /// On `EOF` the instruction pointer stays put and `Step::Halt` is returned,
    /// so calling this again just halts again.
    pub fn step(&mut self, runtime: &mut Runtime, bytecode: &Bytecode) -> Result<Step, Fault> {
        let ip = self.ip;
        // compiled bytecode ends in EOF, only a stale ip from other bytecode gets here
        let instruction = bytecode
            .get(ip)
            .ok_or(FaultKind::InstructionPointerOutOfBounds { len: bytecode.len() }.at(ip))?;
        let opcode = instruction.opcode().ok_or(
            FaultKind::InvalidOpcode {
                raw: instruction.raw_opcode(),
            }
            .at(ip),
        )?;

        if opcode == Opcode::Eof {
            return Ok(Step::Halt);
        }

        if let Some(limit) = self.step_limit {
            if self.steps >= limit {
                return Err(FaultKind::StepLimitExceeded { limit }.at(ip));
            }
        }
        self.steps += 1;

        let by = instruction.distance();
        match opcode {
            Opcode::PtrInc => runtime.shift_right(by),
            Opcode::PtrDec => runtime.shift_left(by),
            Opcode::MemInc => {
                runtime.deref_and_add_value(by);
                Ok(())
            }
            Opcode::MemDec => {
                runtime.deref_and_sub_value(by);
                Ok(())
            }
            Opcode::Read => runtime.read(),
            Opcode::Write => runtime.write(),
            Opcode::JumpForwardsIfZero => {
                if runtime.value_is_zero() {
                    self.ip = self.jump_forwards(bytecode, instruction)?;
                    // don't do the ++
                    return Ok(Step::Continue);
                }
                Ok(())
            }
            Opcode::JumpBackwardsIfNonZero => {
                if !runtime.value_is_zero() {
                    self.ip = self.jump_backwards(bytecode, instruction)?;
                    // don't do the ++
                    return Ok(Step::Continue);
                }
                Ok(())
            }
            Opcode::Nop | Opcode::Eof => Ok(()),
        }
        .map_err(|kind| kind.at(ip))?;

        self.ip += 1;
        Ok(Step::Continue)
    }

    /// The instruction after the `]` matching the `[` at the instruction pointer
    fn jump_forwards(&self, bytecode: &Bytecode, instruction: Instruction) -> Result<usize, Fault> {
        let end = match self.strategy {
            JumpStrategy::Distance => {
                let distance = instruction.distance();
                let target = self.ip + distance;
                self.check_partner(bytecode, target, Opcode::JumpBackwardsIfNonZero, distance)?;
                target
            }
            JumpStrategy::Scan => {
                let mut depth = 0usize;
                let mut pos = self.ip;
                loop {
                    pos += 1;
                    let next = bytecode
                        .get(pos)
                        .filter(|next| !next.is_a(Opcode::Eof))
                        .ok_or(FaultKind::UnbalancedJump.at(self.ip))?;

                    if next.is_a(Opcode::JumpForwardsIfZero) {
                        depth += 1;
                    } else if next.is_a(Opcode::JumpBackwardsIfNonZero) {
                        if depth == 0 {
                            break pos;
                        }
                        depth -= 1;
                    }
                }
            }
        };

        Ok(end + 1)
    }

    /// The `[` matching the `]` at the instruction pointer, so the condition is rechecked
    fn jump_backwards(
        &self,
        bytecode: &Bytecode,
        instruction: Instruction,
    ) -> Result<usize, Fault> {
        match self.strategy {
            JumpStrategy::Distance => {
                let distance = instruction.distance();
                let target = self
                    .ip
                    .checked_sub(distance)
                    .ok_or(FaultKind::MismatchedJump { distance }.at(self.ip))?;
                self.check_partner(bytecode, target, Opcode::JumpForwardsIfZero, distance)?;
                Ok(target)
            }
            JumpStrategy::Scan => {
                let mut depth = 0usize;
                let mut pos = self.ip;
                loop {
                    pos = pos
                        .checked_sub(1)
                        .ok_or(FaultKind::UnbalancedJump.at(self.ip))?;

                    if bytecode[pos].is_a(Opcode::JumpBackwardsIfNonZero) {
                        depth += 1;
                    } else if bytecode[pos].is_a(Opcode::JumpForwardsIfZero) {
                        if depth == 0 {
                            return Ok(pos);
                        }
                        depth -= 1;
                    }
                }
            }
        }
    }

    /// Both brackets of a pair must store the same distance
    fn check_partner(
        &self,
        bytecode: &Bytecode,
        target: usize,
        expected: Opcode,
        distance: usize,
    ) -> Result<(), Fault> {
        match bytecode.get(target) {
            Some(partner) if partner.is_a(expected) && partner.distance() == distance => Ok(()),
            _ => Err(FaultKind::MismatchedJump { distance }.at(self.ip)),
        }
    }
}
