use tracing::trace;

use super::{Irq, Memory, Mmu};

use crate::error::KernelResult;
use crate::io::Instruction;

/// Outcome of one CPU cycle.
#[derive(Debug, PartialEq, Eq)]
pub enum CpuCycle {
    /// No process loaded.
    Idle,
    /// A CPU instruction ran.
    Executed,
    /// The cycle raised an interrupt. Page faults leave the PC untouched,
    /// KILL and IO_IN are raised after the instruction was fetched.
    Interrupt(Irq),
}

pub struct Cpu {
    program_counter: Option<usize>,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            program_counter: None,
        }
    }

    /// `None` is the idle sentinel.
    pub fn program_counter(&self) -> Option<usize> {
        self.program_counter
    }

    pub fn set_program_counter(&mut self, program_counter: Option<usize>) {
        self.program_counter = program_counter;
    }

    pub fn is_busy(&self) -> bool {
        self.program_counter.is_some()
    }

    pub fn cycle(&mut self, mmu: &Mmu, memory: &Memory) -> KernelResult<CpuCycle> {
        let Some(program_counter) = self.program_counter else {
            trace!("cpu - NOOP");
            return Ok(CpuCycle::Idle);
        };

        let instruction = match Self::fetch(program_counter, mmu, memory)? {
            Ok(instruction) => instruction,
            Err(page) => return Ok(CpuCycle::Interrupt(Irq::PageFault { page })),
        };
        self.program_counter = Some(program_counter + 1);

        Ok(Self::execute(instruction, program_counter))
    }

    fn fetch(
        program_counter: usize,
        mmu: &Mmu,
        memory: &Memory,
    ) -> KernelResult<Result<Instruction, usize>> {
        match mmu.translate(program_counter) {
            Ok(physical_address) => Ok(Ok(memory.read_from(physical_address)?)),
            Err(page) => Ok(Err(page)),
        }
    }

    fn execute(instruction: Instruction, program_counter: usize) -> CpuCycle {
        match instruction {
            Instruction::Exit => CpuCycle::Interrupt(Irq::Kill),
            Instruction::Io(operation) => CpuCycle::Interrupt(Irq::IoIn(operation)),
            Instruction::Cpu => {
                trace!("cpu - Exec: {}, PC={}", instruction, program_counter);
                CpuCycle::Executed
            }
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Cpu::new()
    }
}
