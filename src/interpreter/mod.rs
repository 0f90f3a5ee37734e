pub mod bytecode_interpreter;

use std::io::{self, ErrorKind, Read, Write};

use thiserror::Error;

pub use self::bytecode_interpreter::{ByteCodeInterpreter, JumpStrategy, Step};

/// A single memory cell, arithmetic on it wraps
pub type Cell = i8;

/// A runtime fault along with the instruction that caused it
#[derive(Error, Debug)]
#[error("{kind:} (at instruction {ip:})")]
pub struct Fault {
    pub ip: usize,
    pub kind: FaultKind,
}

#[derive(Error, Debug)]
pub enum FaultKind {
    #[error("Data pointer ({data_pointer:}) moved right by {by:} out of bounds (max length {tape_len:})")]
    DataPointerOverflow {
        data_pointer: usize,
        by: usize,
        tape_len: usize,
    },

    #[error("Data pointer ({data_pointer:}) moved left by {by:} below zero")]
    DataPointerUnderflow { data_pointer: usize, by: usize },

    #[error("Instruction pointer ran past the end of the program (length {len:})")]
    InstructionPointerOutOfBounds { len: usize },

    #[error("Unknown opcode {raw:#04x}")]
    InvalidOpcode { raw: u8 },

    #[error("Jump distance {distance:} doesn't lead to a matching bracket")]
    MismatchedJump { distance: usize },

    #[error("Scanned off the end of the program looking for a matching bracket")]
    UnbalancedJump,

    #[error("Step limit of {limit:} reached")]
    StepLimitExceeded { limit: u64 },

    #[error("IO Error")]
    Io(
        #[from]
        io::Error,
    ),
}

impl FaultKind {
    pub fn at(self, ip: usize) -> Fault {
        Fault { ip, kind: self }
    }
}

pub struct Runtime<'io> {
    /// Pointer into the tape
    data_pointer: usize,

    /// Our statically allocated tape
    tape: Vec<Cell>,

    in_stream: Box<dyn Read + 'io>,
    out_stream: Box<dyn Write + 'io>,
}

impl<'io> Runtime<'io> {
    pub fn new(
        tape_size: usize,
        in_stream: Box<dyn Read + 'io>,
        out_stream: Box<dyn Write + 'io>,
    ) -> Self {
        Self {
            data_pointer: 0,
            // the data pointer always has a cell to point at
            tape: vec![0; tape_size.max(1)],
            in_stream,
            out_stream,
        }
    }

    pub fn reset(&mut self) {
        self.tape.iter_mut().for_each(|cell| *cell = 0);
        self.data_pointer = 0;
    }

    /// Replaces the tape with a fresh zeroed one of the given size
    pub fn resize(&mut self, tape_size: usize) {
        self.tape = vec![0; tape_size.max(1)];
        self.data_pointer = 0;
    }

    /// Read one byte from the input stream into the current cell, end of input reads as 0
    pub fn read(&mut self) -> Result<(), FaultKind> {
        let mut byte = [0u8; 1];
        let value = loop {
            match self.in_stream.read(&mut byte) {
                Ok(0) => break 0,
                Ok(_) => break byte[0] as Cell,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(FaultKind::Io(e)),
            }
        };
        self.tape[self.data_pointer] = value;
        Ok(())
    }

    /// Write the current cell to the output stream
    pub fn write(&mut self) -> Result<(), FaultKind> {
        self.out_stream.write_all(&[self.value() as u8])?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), FaultKind> {
        self.out_stream.flush()?;
        Ok(())
    }

    /// Cells hold 8 bits so only the low byte of `by` matters
    pub fn deref_and_add_value(&mut self, by: usize) {
        let cell = &mut self.tape[self.data_pointer];
        *cell = cell.wrapping_add(by as u8 as Cell);
    }

    pub fn deref_and_sub_value(&mut self, by: usize) {
        let cell = &mut self.tape[self.data_pointer];
        *cell = cell.wrapping_sub(by as u8 as Cell);
    }

    pub fn shift_right(&mut self, by: usize) -> Result<(), FaultKind> {
        match self.data_pointer.checked_add(by) {
            Some(moved) if moved < self.tape.len() => {
                self.data_pointer = moved;
                Ok(())
            }
            _ => Err(FaultKind::DataPointerOverflow {
                data_pointer: self.data_pointer,
                by,
                tape_len: self.tape.len(),
            }),
        }
    }

    pub fn shift_left(&mut self, by: usize) -> Result<(), FaultKind> {
        self.data_pointer = self.data_pointer.checked_sub(by).ok_or(
            FaultKind::DataPointerUnderflow {
                data_pointer: self.data_pointer,
                by,
            },
        )?;
        Ok(())
    }

    /// The value at the data pointer
    pub fn value(&self) -> Cell {
        self.tape[self.data_pointer]
    }

    /// is the value at the data pointer zero?
    pub fn value_is_zero(&self) -> bool {
        self.value() == 0
    }

    pub fn value_at(&self, offset: usize) -> Option<Cell> {
        self.tape.get(offset).copied()
    }

    pub fn data_pointer(&self) -> usize {
        self.data_pointer
    }

    pub fn tape(&self) -> &[Cell] {
        &self.tape
    }
}
