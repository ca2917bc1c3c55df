mod dispatcher;
mod interrupts;
mod io_controller;
mod long_term_scheduler;
mod memory_manager;
mod page_loader;
mod process_control_block;
mod short_term_scheduler;
mod system;

pub use dispatcher::Dispatcher;
pub use io_controller::IoDeviceController;
pub use long_term_scheduler::{LongTermScheduler, Submission};
pub use memory_manager::{Allocation, FifoReplacement, MemoryManager, ReplacementPolicy, Victim};
pub use page_loader::Loader;
pub use process_control_block::{PcbTable, Pid, ProcessControlBlock, ProcessState};
pub use short_term_scheduler::{SchedulingAlgorithm, ShortTermScheduler};

pub use system::Kernel;
