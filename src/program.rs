use std::io::{self, Read, Write};

use thiserror::Error;

use crate::{
    bytecode::Bytecode,
    compiler::{compile_with, CompileError, CompileFlags},
    interpreter::{ByteCodeInterpreter, Cell, Fault, JumpStrategy, Runtime, Step},
};

/// 32k cells, same as the classic implementation
pub const DEFAULT_TAPE_SIZE: usize = 32 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Not started yet, may or may not be compiled
    Ready,
    Running,
    /// Reached `EOF`
    Halted,
    /// Stopped by a runtime fault
    Faulted,
}

#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("Program is malformed: {0}")]
    Compile(
        #[from]
        CompileError,
    ),

    #[error("Program crashed: {0}")]
    Fault(
        #[from]
        Fault,
    ),

    #[error("Program already finished ({0:?}), reset it before running again")]
    Finished(State),
}

/// Owns the source, its compiled bytecode, the tape and both cursors.
///
/// Compiles lazily on the first `run()`/`step()`.  Once halted or faulted the
/// program stays that way until `reset()`.
pub struct Program<'io> {
    source: String,
    flags: CompileFlags,
    bytecode: Option<Bytecode>,

    runtime: Runtime<'io>,
    interpreter: ByteCodeInterpreter,
    state: State,
}

impl Program<'static> {
    /// A program reading from stdin and writing to stdout
    pub fn new(source: &str) -> Program<'static> {
        Program::with_io(source, Box::new(io::stdin()), Box::new(io::stdout()))
    }
}

impl<'io> Program<'io> {
    pub fn with_io(
        source: &str,
        in_stream: Box<dyn Read + 'io>,
        out_stream: Box<dyn Write + 'io>,
    ) -> Program<'io> {
        Program {
            source: source.to_string(),
            flags: CompileFlags::empty(),
            bytecode: None,
            runtime: Runtime::new(DEFAULT_TAPE_SIZE, in_stream, out_stream),
            interpreter: ByteCodeInterpreter::new(JumpStrategy::default()),
            state: State::Ready,
        }
    }

    pub fn tape_size(mut self, tape_size: usize) -> Self {
        self.runtime.resize(tape_size);
        self
    }

    /// Changing flags throws away anything already compiled
    pub fn compile_flags(mut self, flags: CompileFlags) -> Self {
        self.flags = flags;
        self.bytecode = None;
        self
    }

    pub fn jump_strategy(mut self, strategy: JumpStrategy) -> Self {
        self.interpreter.set_strategy(strategy);
        self
    }

    pub fn step_limit(mut self, step_limit: Option<u64>) -> Self {
        self.interpreter.set_step_limit(step_limit);
        self
    }

    /// Compiles the source if it hasn't been already
    pub fn compile(&mut self) -> Result<&Bytecode, CompileError> {
        compile_once(&mut self.bytecode, &self.source, self.flags)
    }

    /// Runs until the program halts or faults
    pub fn run(&mut self) -> Result<(), ProgramError> {
        let result = {
            let (bytecode, interpreter, runtime) = self.start()?;
            interpreter.run(runtime, bytecode)
        };
        self.finish(result)
    }

    /// Executes a single instruction and returns the state afterwards
    pub fn step(&mut self) -> Result<State, ProgramError> {
        let result = {
            let (bytecode, interpreter, runtime) = self.start()?;
            interpreter.step(runtime, bytecode)
        };
        match result {
            Ok(Step::Continue) => {}
            Ok(Step::Halt) => self.finish(Ok(()))?,
            Err(fault) => self.finish(Err(fault))?,
        }
        Ok(self.state)
    }

    /// Back to `Ready` with a zeroed tape, keeps the compiled bytecode
    pub fn reset(&mut self) {
        self.runtime.reset();
        self.interpreter.reset();
        self.state = State::Ready;
    }

    /// Compiles if needed and moves to `Running`, handing out the pieces needed to execute
    fn start(
        &mut self,
    ) -> Result<(&Bytecode, &mut ByteCodeInterpreter, &mut Runtime<'io>), ProgramError> {
        if let State::Halted | State::Faulted = self.state {
            return Err(ProgramError::Finished(self.state));
        }

        // a compile error leaves the program `Ready`, nothing ever ran
        let bytecode = compile_once(&mut self.bytecode, &self.source, self.flags)?;
        self.state = State::Running;
        Ok((bytecode, &mut self.interpreter, &mut self.runtime))
    }

    fn finish(&mut self, result: Result<(), Fault>) -> Result<(), ProgramError> {
        let ip = self.interpreter.ip();
        match result {
            Ok(()) => {
                self.runtime.flush().map_err(|kind| {
                    self.state = State::Faulted;
                    kind.at(ip)
                })?;
                self.state = State::Halted;
                Ok(())
            }
            Err(fault) => {
                self.state = State::Faulted;
                // still hand over whatever was written before the fault
                let _ = self.runtime.flush();
                Err(fault.into())
            }
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// `None` until compiled
    pub fn bytecode(&self) -> Option<&Bytecode> {
        self.bytecode.as_ref()
    }

    /// Value of the cell at `offset`, `None` if it's off the tape
    pub fn value_at(&self, offset: usize) -> Option<Cell> {
        self.runtime.value_at(offset)
    }

    pub fn instruction_offset(&self) -> usize {
        self.interpreter.ip()
    }

    pub fn memory_pointer_offset(&self) -> usize {
        self.runtime.data_pointer()
    }

    pub fn tape(&self) -> &[Cell] {
        self.runtime.tape()
    }

    pub fn steps(&self) -> u64 {
        self.interpreter.steps()
    }
}

/// Fills `slot` with the compiled `source` unless it already holds bytecode
fn compile_once<'a>(
    slot: &'a mut Option<Bytecode>,
    source: &str,
    flags: CompileFlags,
) -> Result<&'a Bytecode, CompileError> {
    let bytecode = match slot.take() {
        Some(bytecode) => bytecode,
        None => compile_with(source, flags)?,
    };
    Ok(slot.insert(bytecode))
}
