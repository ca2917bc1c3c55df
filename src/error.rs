//! Error types for the kernel simulator.

use thiserror::Error;

use crate::kernel::{Pid, ProcessState};

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Kernel simulator error types
#[derive(Debug, Error)]
pub enum KernelError {
    // ========== Capacity ==========

    /// Every frame is taken and the swap area cannot take another page
    #[error("Memory full: no free frames and swap holds {swap_used} of {swap_capacity} pages")]
    MemoryFull { swap_used: usize, swap_capacity: usize },

    // ========== Not found ==========

    /// A page claimed to be swapped out is missing from swap
    #[error("Page {page} of process {pid} is not in swap")]
    NotInSwap { pid: Pid, page: usize },

    /// No program stored under the given path
    #[error("No file found in path {0}")]
    FileNotFound(String),

    /// The requested page starts past the end of the program
    #[error("Page {page} is past the end of {path}")]
    PageOutOfRange { path: String, page: usize },

    /// No PCB with the given pid
    #[error("Unknown process: {0}")]
    UnknownPid(Pid),

    // ========== Contract violations ==========

    /// A program must contain at least one instruction
    #[error("Program {0} has no instructions")]
    EmptyProgram(String),

    /// A handler needed the running process but the CPU is idle
    #[error("No process is running")]
    NoRunningProcess,

    /// IO_OUT arrived while the device had nothing in flight
    #[error("I/O device finished without an operation in flight")]
    NoFinishedIo,

    /// Process state machine edge that does not exist
    #[error("Illegal transition for process {pid}: {from:?} -> {to:?}")]
    IllegalTransition {
        pid: Pid,
        from: ProcessState,
        to: ProcessState,
    },

    /// Interrupt kind with no handler in the vector
    #[error("No handler registered for {0} interrupt")]
    UnregisteredInterrupt(&'static str),

    /// Interrupt raised while another one was being handled
    #[error("{0} interrupt raised while another interrupt was being handled")]
    ReentrantInterrupt(&'static str),

    // ========== Hardware faults ==========

    /// Memory access outside the physical memory
    #[error("Out of bounds memory access: address {address} (size {size})")]
    AddressOutOfBounds { address: usize, size: usize },

    /// Fetch from a cell that was never written
    #[error("Read of uninitialized memory cell {0}")]
    UninitializedCell(usize),

    /// The retried fetch still faulted after the page fault was handled
    #[error("Page {0} still unmapped after page fault handling")]
    UnresolvedPageFault(usize),

    // ========== Driver ==========

    /// The simulation did not finish within the allowed number of ticks
    #[error("Simulation did not finish within {0} ticks")]
    TickLimit(u64),

    /// Malformed program file
    #[error("Program file line {line}: {reason}")]
    ProgramFile { line: usize, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KernelError {
    /// Check if this error is the legitimate out-of-memory condition rather
    /// than a broken invariant
    pub fn is_capacity(&self) -> bool {
        matches!(self, KernelError::MemoryFull { .. })
    }
}
