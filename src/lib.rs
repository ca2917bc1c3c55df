//! Interrupt-driven kernel simulator.
//!
//! A small kernel (process table, schedulers, demand paging with swap and a
//! single I/O device) running on a deterministic, tick-driven machine model.
//! Every event reaches the kernel as an interrupt and is handled to
//! completion before the CPU executes again.
//!
//! # Example
//!
//! ```ignore
//! use kernsim::prelude::*;
//!
//! let mut kernel = Kernel::new(&SimulatorConfig::default())?;
//! kernel.file_system_mut().write("c:/a.exe", Program::new("a", [Asm::cpu(3), Asm::io()])?);
//! kernel.run("c:/a.exe", 1)?;
//! kernel.run_to_completion()?;
//! ```

pub mod config;
pub mod error;
pub mod hardware;
pub mod io;
pub mod kernel;
pub mod stats;

pub use config::SimulatorConfig;
pub use error::{KernelError, KernelResult};
pub use kernel::{Kernel, Pid, ProcessState, SchedulingAlgorithm};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        io::{Asm, FileSystem, Instruction, IoOperation, Program},
        stats::{GanttChart, Reporter},
        Kernel, KernelError, KernelResult, Pid, ProcessState, SchedulingAlgorithm, SimulatorConfig,
    };
}
