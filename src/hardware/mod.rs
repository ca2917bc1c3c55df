//! Deterministic model of the machine the kernel runs on.
//!
//! Everything here is driven one tick at a time by the kernel, which also
//! receives every interrupt the devices raise.

mod cpu;
mod io_device;
mod memory;
mod mmu;
mod timer;

pub use cpu::{Cpu, CpuCycle};
pub use io_device::IoDevice;
pub use memory::Memory;
pub use mmu::Mmu;
pub use timer::{Clock, Tick, Timer};

use crate::io::IoOperation;

/// Interrupt request with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Irq {
    New { path: String, priority: u32 },
    Kill,
    IoIn(IoOperation),
    IoOut,
    Timeout,
    PageFault { page: usize },
    Stat,
}

impl Irq {
    pub fn kind(&self) -> IrqKind {
        match self {
            Irq::New { .. } => IrqKind::New,
            Irq::Kill => IrqKind::Kill,
            Irq::IoIn(_) => IrqKind::IoIn,
            Irq::IoOut => IrqKind::IoOut,
            Irq::Timeout => IrqKind::Timeout,
            Irq::PageFault { .. } => IrqKind::PageFault,
            Irq::Stat => IrqKind::Stat,
        }
    }
}

/// Interrupt type, the index into the interrupt vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqKind {
    New = 0,
    Kill,
    IoIn,
    IoOut,
    Timeout,
    PageFault,
    Stat,
}

impl IrqKind {
    pub const COUNT: usize = 7;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            IrqKind::New => "NEW",
            IrqKind::Kill => "KILL",
            IrqKind::IoIn => "IO_IN",
            IrqKind::IoOut => "IO_OUT",
            IrqKind::Timeout => "TIMEOUT",
            IrqKind::PageFault => "PAGE_FAULT",
            IrqKind::Stat => "STAT",
        }
    }
}

/// The machine: CPU, MMU, memory, timer, clock and the I/O device.
pub struct Hardware {
    pub cpu: Cpu,
    pub mmu: Mmu,
    pub memory: Memory,
    pub timer: Timer,
    pub clock: Clock,
    pub io_device: IoDevice,
}

impl Hardware {
    pub fn new(memory_size: usize, frame_size: usize, quantum: Option<u32>) -> Hardware {
        Hardware {
            cpu: Cpu::new(),
            mmu: Mmu::new(frame_size),
            memory: Memory::new(memory_size),
            timer: Timer::new(quantum),
            clock: Clock::new(),
            io_device: IoDevice::new(),
        }
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }
}
