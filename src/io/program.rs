use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

/// Default number of ticks an IO instruction keeps the device busy.
pub const DEFAULT_IO_TICKS: u32 = 3;

/// An operation handed to the I/O device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoOperation {
    pub ticks: u32,
}

impl IoOperation {
    pub fn new(ticks: u32) -> IoOperation {
        IoOperation { ticks }
    }
}

impl Default for IoOperation {
    fn default() -> Self {
        IoOperation::new(DEFAULT_IO_TICKS)
    }
}

/// One instruction word, the content of a memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Cpu,
    Io(IoOperation),
    Exit,
}

impl Instruction {
    pub fn is_exit(&self) -> bool {
        matches!(self, Instruction::Exit)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Cpu => write!(f, "CPU"),
            Instruction::Io(op) => write!(f, "IO({})", op.ticks),
            Instruction::Exit => write!(f, "EXIT"),
        }
    }
}

/// Builders for instruction blocks.
pub struct Asm {}

impl Asm {
    pub fn cpu(times: usize) -> Vec<Instruction> {
        vec![Instruction::Cpu; times]
    }

    pub fn io() -> Vec<Instruction> {
        vec![Instruction::Io(IoOperation::default())]
    }

    pub fn io_for(ticks: u32) -> Vec<Instruction> {
        vec![Instruction::Io(IoOperation::new(ticks))]
    }

    pub fn exit() -> Vec<Instruction> {
        vec![Instruction::Exit]
    }
}

/// A compiled program. Immutable once expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    name: String,
    instructions: Vec<Instruction>,
}

impl Program {
    /// Flattens the instruction blocks and terminates them with a single EXIT.
    pub fn new<B, I>(name: impl Into<String>, blocks: B) -> KernelResult<Program>
    where
        B: IntoIterator<Item = I>,
        I: IntoIterator<Item = Instruction>,
    {
        let name = name.into();
        let flattened: Vec<Instruction> = blocks.into_iter().flatten().collect();

        if flattened.is_empty() {
            return Err(KernelError::EmptyProgram(name));
        }

        Ok(Program {
            name,
            instructions: Self::expand(flattened),
        })
    }

    fn expand(mut expanded: Vec<Instruction>) -> Vec<Instruction> {
        while expanded.last().is_some_and(Instruction::is_exit) {
            expanded.pop();
        }
        expanded.push(Instruction::Exit);

        expanded
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
