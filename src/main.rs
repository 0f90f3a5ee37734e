extern crate clap;
extern crate thiserror;

pub mod bytecode;
pub mod compiler;
pub mod demos;
pub mod interpreter;
pub mod lexer;
pub mod program;

use std::{
    collections::HashSet,
    fmt::Display,
    fs,
    hash::Hash,
    io,
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

use clap::{Parser, ValueEnum};
use colored::Colorize;
use thiserror::Error;

use crate::{
    compiler::CompileFlags,
    interpreter::JumpStrategy,
    lexer::{lexer::Lexer, TokenKind},
    program::{Program, ProgramError, State, DEFAULT_TAPE_SIZE},
};

/// Brainfreeze compiler/interpreter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The file to operate on, runs a built in hello world when omitted
    #[arg()]
    file: Option<PathBuf>,

    /// What to do with the program, defaults to running it
    #[arg(short, long = "command", value_enum)]
    commands: Vec<Commands>,

    #[arg(short, long, value_enum)]
    optimizations: Vec<Optimizations>,

    #[arg(short, long)]
    all_optimizations: bool,

    /// Number of cells on the tape
    #[arg(short, long, default_value_t = DEFAULT_TAPE_SIZE)]
    tape_size: usize,

    #[arg(short, long, value_enum, default_value_t = Jumps::Distance)]
    jump_strategy: Jumps,

    /// Fault once this many instructions have run
    #[arg(short, long)]
    step_limit: Option<u64>,

    /// Write the compiled bytecode words (little endian) to this file
    #[arg(short, long)]
    emit: Option<PathBuf>,

    /// Only print what the program itself writes
    #[arg(short, long)]
    quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Hash, PartialEq, Eq)]
pub enum Optimizations {
    /// Fold runs of `>`, `<`, `+` or `-` into one instruction
    CoalesceRuns,
    /// Drop a loop at the very start of the program
    CommentBlock,
}

#[derive(ValueEnum, Debug, Clone, Hash, PartialEq, Eq)]
enum Commands {
    /// Output the lexer
    Tokens,
    /// Output Bytecode
    Bytecode,
    /// Step through the program printing every instruction as it runs
    Trace,
    /// Run the bytecode interpreter
    Run,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Jumps {
    /// Jump straight to the matching bracket using the stored distance
    Distance,
    /// Scan for the matching bracket counting nested loops
    Scan,
}

impl From<Jumps> for JumpStrategy {
    fn from(jumps: Jumps) -> Self {
        match jumps {
            Jumps::Distance => JumpStrategy::Distance,
            Jumps::Scan => JumpStrategy::Scan,
        }
    }
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Can't read {path:?}: {source:}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Can't write bytecode to {path:?}: {source:}")]
    Emit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Program(#[from] ProgramError),
}

impl CliError {
    /// Malformed programs and crashed programs are told apart by exit status
    fn exit_status(&self) -> u8 {
        match self {
            CliError::Program(ProgramError::Compile(_)) => 2,
            CliError::Program(ProgramError::Fault(_)) => 3,
            _ => 1,
        }
    }
}

/// Status lines go to stderr so they never mix with the program's output
struct Status {
    quiet: bool,
}

impl Status {
    fn print(&self, line: impl Display) {
        if !self.quiet {
            eprintln!("{}", line);
        }
    }

    fn starting(&self, what: &str) {
        self.print(format!("Starting {}", what).blue());
    }

    fn finished(&self, what: &str, now: Instant) {
        self.print(format!(
            "{} {:.2?}",
            format!("Finished {} in", what).green(),
            now.elapsed()
        ));
    }
}

fn collect_set<T: Eq + Hash>(values: Vec<T>) -> HashSet<T> {
    HashSet::from_iter(values.into_iter())
}

fn print_tokens(source: &str) {
    for token in Lexer::new(source) {
        match &token.kind {
            TokenKind::Comment(c) => println!("\t\t{}", c),
            kind => print!("{}", kind.glyph().unwrap_or('?')),
        }
    }
    println!();
}

/// Single steps `program` to the end, one line per executed instruction on stderr
fn trace(program: &mut Program) -> Result<(), ProgramError> {
    loop {
        let ip = program.instruction_offset();
        let instruction = program
            .bytecode()
            .and_then(|bytecode| bytecode.get(ip))
            .map_or_else(|| "??".to_string(), |instruction| instruction.to_string());
        let data_pointer = program.memory_pointer_offset();
        let state = program.step()?;

        eprintln!(
            "{:>6} {:<12} {} {:>6} {} {}",
            ip,
            instruction,
            "dp".dimmed(),
            data_pointer,
            "cell".dimmed(),
            program.value_at(data_pointer).unwrap_or(0)
        );

        if state != State::Running {
            return Ok(());
        }
    }
}

/// Where the program stopped and how much of the tape it touched
fn summary(program: &Program) -> String {
    let touched = program.tape().iter().filter(|&&cell| cell != 0).count();
    format!(
        "{:?} at instruction {} with the data pointer at {}, {} non-zero cells",
        program.state(),
        program.instruction_offset(),
        program.memory_pointer_offset(),
        touched
    )
}

fn run(args: Args) -> Result<(), CliError> {
    let status = Status { quiet: args.quiet };
    let mut commands = collect_set(args.commands);
    if commands.is_empty() {
        commands.insert(Commands::Run);
    }

    let mut flags = CompileFlags::empty();
    for optimization in collect_set(args.optimizations).iter() {
        flags |= CompileFlags::from(optimization);
    }
    if args.all_optimizations {
        flags = CompileFlags::all();
    }

    let source = match &args.file {
        Some(path) => {
            status.print(format!("Running {}", path.display()));
            fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?
        }
        None => {
            status.print("No file given, running the hello world demo".yellow());
            demos::HELLO_WORLD.to_string()
        }
    };

    if commands.contains(&Commands::Tokens) {
        print_tokens(&source);
    }

    let mut program = Program::new(&source)
        .tape_size(args.tape_size)
        .compile_flags(flags)
        .jump_strategy(args.jump_strategy.into())
        .step_limit(args.step_limit);

    status.starting(&format!("compiling with {:?}", flags));
    let now = Instant::now();
    let bytecode = program.compile().map_err(ProgramError::from)?;
    status.finished(&format!("compiling {} instructions", bytecode.len()), now);

    if commands.contains(&Commands::Bytecode) {
        print!("{}", bytecode);
    }

    if let Some(path) = &args.emit {
        fs::write(path, bytecode.to_le_bytes()).map_err(|source| CliError::Emit {
            path: path.clone(),
            source,
        })?;
        status.print(format!("{} {}", "Wrote bytecode to".green(), path.display()));
    }

    if commands.contains(&Commands::Trace) {
        status.starting("trace");
        let now = Instant::now();
        let result = trace(&mut program);
        status.print("");
        result?;
        status.finished("trace", now);
        status.print(summary(&program));
        program.reset();
    }

    if commands.contains(&Commands::Run) {
        status.starting("bytecode-interpreter");
        let now = Instant::now();
        let result = program.run();
        // the program's output may not end in a newline
        status.print("");
        result?;
        status.finished("bytecode-interpreter", now);
        status.print(format!("{} after {} steps", summary(&program), program.steps()));
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{0:}: {1:}", "Error".red(), e);
            ExitCode::from(e.exit_status())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::{compiler::compile, interpreter::FaultKind};

    #[test]
    fn malformed_and_crashed_programs_exit_differently() {
        let malformed = CliError::from(ProgramError::from(compile("+]").unwrap_err()));
        let crashed = CliError::from(ProgramError::from(FaultKind::UnbalancedJump.at(4)));
        let unreadable = CliError::Read {
            path: PathBuf::from("missing.bf"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };

        assert_eq!(malformed.exit_status(), 2);
        assert_eq!(crashed.exit_status(), 3);
        assert_eq!(unreadable.exit_status(), 1);
        assert_eq!(CliError::from(ProgramError::Finished(State::Halted)).exit_status(), 1);
    }
}
