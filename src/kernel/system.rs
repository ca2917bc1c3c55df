use tracing::{debug, info};

use super::interrupts::{self, InterruptVector};
use super::{
    Dispatcher, FifoReplacement, IoDeviceController, LongTermScheduler, MemoryManager, PcbTable,
    Pid, ProcessState, ShortTermScheduler,
};

use crate::config::SimulatorConfig;
use crate::error::{KernelError, KernelResult};
use crate::hardware::{CpuCycle, Hardware, Irq, Tick};
use crate::io::FileSystem;
use crate::stats::{GanttChart, Reporter};

/// Composition root: owns the hardware and every kernel structure, and
/// routes interrupts to their handlers one at a time.
pub struct Kernel {
    pub(super) hardware: Hardware,
    pub(super) file_system: FileSystem,
    pub(super) pcb_table: PcbTable,
    pub(super) scheduler: ShortTermScheduler,
    pub(super) memory_manager: MemoryManager,
    pub(super) io_controller: IoDeviceController,
    pub(super) long_term: LongTermScheduler,
    pub(super) reporter: Box<dyn Reporter>,
    pub(super) vector: InterruptVector,
    enable_stats: bool,
    max_ticks: u64,
}

impl Kernel {
    pub fn new(config: &SimulatorConfig) -> KernelResult<Kernel> {
        Self::with_reporter(config, Box::new(GanttChart::new()))
    }

    pub fn with_reporter(
        config: &SimulatorConfig,
        reporter: Box<dyn Reporter>,
    ) -> KernelResult<Kernel> {
        config.validate()?;

        info!(
            "booting kernel: {} cells, {} frames of {}, {} swap pages, {}",
            config.memory_size,
            config.frames(),
            config.frame_size,
            config.swap_pages,
            config.scheduler
        );

        Ok(Kernel {
            hardware: Hardware::new(
                config.memory_size,
                config.frame_size,
                config.scheduler.quantum(),
            ),
            file_system: FileSystem::new(),
            pcb_table: PcbTable::new(),
            scheduler: ShortTermScheduler::new(config.scheduler),
            memory_manager: MemoryManager::new(
                config.memory_size,
                config.frame_size,
                config.swap_pages,
                Box::new(FifoReplacement::new()),
            ),
            io_controller: IoDeviceController::new(),
            long_term: LongTermScheduler::new(),
            reporter,
            vector: InterruptVector::with_kernel_handlers(),
            enable_stats: config.enable_stats,
            max_ticks: config.max_ticks,
        })
    }

    /// Submits the program at `path`. Raises NEW synchronously.
    pub fn run(&mut self, path: &str, priority: u32) -> KernelResult<()> {
        interrupts::deliver(
            self,
            Irq::New {
                path: path.to_string(),
                priority,
            },
        )
    }

    /// Submits the program at `path` once `delay` more ticks have passed.
    pub fn run_with_delay(&mut self, path: &str, priority: u32, delay: u64) {
        let due = self.current_tick().saturating_add(delay);
        debug!("{} scheduled for submission at tick {}", path, due);
        self.long_term.enqueue(path, priority, due);
    }

    /// Advances the machine one tick. Returns the process that executed an
    /// instruction during it, if any.
    pub fn tick(&mut self) -> KernelResult<Option<Pid>> {
        let now = self.current_tick();
        debug!("--------------- tick: {} ---------------", now);

        // A rejected submission leaves the later due ones queued.
        while let Some(submission) = self.long_term.next_due(now) {
            interrupts::deliver(
                self,
                Irq::New {
                    path: submission.path,
                    priority: submission.priority,
                },
            )?;
        }

        if self.hardware.io_device.tick() {
            interrupts::deliver(self, Irq::IoOut)?;
        }

        let executed = if self.hardware.timer.tick(self.hardware.cpu.is_busy()) {
            interrupts::deliver(self, Irq::Timeout)?;
            None
        } else {
            self.cpu_cycle()?
        };

        if self.enable_stats {
            interrupts::deliver(self, Irq::Stat)?;
        }

        self.hardware.clock.advance();
        Ok(executed)
    }

    /// Ticks until every submitted process has terminated.
    pub fn run_to_completion(&mut self) -> KernelResult<u64> {
        let mut ticks = 0;
        while !self.is_finished() {
            if ticks >= self.max_ticks {
                return Err(KernelError::TickLimit(self.max_ticks));
            }
            self.tick()?;
            ticks += 1;
        }

        info!("all processes finished after {} ticks", ticks);
        Ok(ticks)
    }

    pub fn is_finished(&self) -> bool {
        !self.long_term.has_programs() && self.pcb_table.all_terminated()
    }

    fn cpu_cycle(&mut self) -> KernelResult<Option<Pid>> {
        let running = self.pcb_table.running_pid();

        let mut cycle = self.hardware.cpu.cycle(&self.hardware.mmu, &self.hardware.memory)?;
        if let CpuCycle::Interrupt(Irq::PageFault { page }) = cycle {
            interrupts::deliver(self, Irq::PageFault { page })?;

            // Same instruction again, the PC did not move.
            cycle = self.hardware.cpu.cycle(&self.hardware.mmu, &self.hardware.memory)?;
            if let CpuCycle::Interrupt(Irq::PageFault { page }) = cycle {
                return Err(KernelError::UnresolvedPageFault(page));
            }
        }

        match cycle {
            CpuCycle::Idle => Ok(None),
            CpuCycle::Executed => Ok(running),
            CpuCycle::Interrupt(irq) => {
                interrupts::deliver(self, irq)?;
                Ok(running)
            }
        }
    }

    // ========== Shared primitives used by the handlers ==========

    /// Runs `pid` if the CPU is idle, otherwise lets the policy decide
    /// between preempting the running process and queueing `pid`.
    pub(super) fn admit(&mut self, pid: Pid) -> KernelResult<()> {
        let Some(running) = self.pcb_table.running_pid() else {
            return self.run_process(pid);
        };

        let preempt = self
            .scheduler
            .must_preempt(self.pcb_table.get(running)?, self.pcb_table.get(pid)?);
        if preempt {
            info!("process {} preempts process {}", pid, running);
            self.context_switch(pid)
        } else {
            self.make_ready(pid)
        }
    }

    /// Dispatches the next ready process, if there is one. The CPU must be idle.
    pub(super) fn advance_ready(&mut self) -> KernelResult<()> {
        if self.scheduler.is_empty() {
            return Ok(());
        }
        match self.scheduler.schedule_next() {
            Some(next) => self.run_process(next),
            None => Ok(()),
        }
    }

    /// Sends the running process back to the ready queue and runs `next`.
    pub(super) fn context_switch(&mut self, next: Pid) -> KernelResult<()> {
        let running = self.pcb_table.running_pid().ok_or(KernelError::NoRunningProcess)?;
        let now = self.current_tick();

        let pcb = self.pcb_table.get_mut(running)?;
        Dispatcher::save(pcb, &mut self.hardware)?;
        pcb.set_state(ProcessState::Ready)?;
        self.scheduler.schedule_process(pcb, now);
        self.pcb_table.set_running(None);

        info!("context switch: {} -> {}", running, next);
        self.run_process(next)
    }

    pub(super) fn run_process(&mut self, pid: Pid) -> KernelResult<()> {
        self.hardware.timer.reset();

        let pcb = self.pcb_table.get_mut(pid)?;
        pcb.set_state(ProcessState::Running)?;
        Dispatcher::load(pcb, &mut self.hardware);
        self.pcb_table.set_running(Some(pid));

        info!("running process {}", pid);
        Ok(())
    }

    fn make_ready(&mut self, pid: Pid) -> KernelResult<()> {
        let now = self.current_tick();

        let pcb = self.pcb_table.get_mut(pid)?;
        pcb.set_state(ProcessState::Ready)?;
        self.scheduler.schedule_process(pcb, now);
        Ok(())
    }

    // ========== Introspection ==========

    pub fn pcb_table(&self) -> &PcbTable {
        &self.pcb_table
    }

    pub fn scheduler(&self) -> &ShortTermScheduler {
        &self.scheduler
    }

    pub fn memory_manager(&self) -> &MemoryManager {
        &self.memory_manager
    }

    pub fn io_controller(&self) -> &IoDeviceController {
        &self.io_controller
    }

    pub fn file_system(&self) -> &FileSystem {
        &self.file_system
    }

    pub fn file_system_mut(&mut self) -> &mut FileSystem {
        &mut self.file_system
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hardware
    }

    pub fn current_tick(&self) -> Tick {
        self.hardware.current_tick()
    }

    /// The reporter's summary of the run so far.
    pub fn summary(&self) -> Option<String> {
        self.reporter.summary()
    }
}
