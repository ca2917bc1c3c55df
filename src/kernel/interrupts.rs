//! Interrupt vector and handlers.
//!
//! Handlers run to completion one at a time. A handler may call the kernel's
//! shared primitives but never raises another interrupt.

use tracing::{debug, info};

use super::{Dispatcher, Kernel, Loader, ProcessControlBlock, ProcessState};

use crate::error::{KernelError, KernelResult};
use crate::hardware::{Irq, IrqKind};

pub(super) type Handler = fn(&mut Kernel, Irq) -> KernelResult<()>;

/// Fixed table of handlers indexed by interrupt kind.
pub struct InterruptVector {
    handlers: [Option<Handler>; IrqKind::COUNT],
    handling: Option<IrqKind>,
}

impl InterruptVector {
    pub(super) fn new() -> InterruptVector {
        InterruptVector {
            handlers: [None; IrqKind::COUNT],
            handling: None,
        }
    }

    pub(super) fn with_kernel_handlers() -> InterruptVector {
        let mut vector = InterruptVector::new();
        vector.register(IrqKind::New, new_handler);
        vector.register(IrqKind::Kill, kill_handler);
        vector.register(IrqKind::IoIn, io_in_handler);
        vector.register(IrqKind::IoOut, io_out_handler);
        vector.register(IrqKind::Timeout, timeout_handler);
        vector.register(IrqKind::PageFault, page_fault_handler);
        vector.register(IrqKind::Stat, stat_handler);
        vector
    }

    pub(super) fn register(&mut self, kind: IrqKind, handler: Handler) {
        self.handlers[kind.index()] = Some(handler);
    }
}

/// Runs the handler registered for `irq` and returns once it has finished.
pub(super) fn deliver(kernel: &mut Kernel, irq: Irq) -> KernelResult<()> {
    let kind = irq.kind();
    if kernel.vector.handling.is_some() {
        return Err(KernelError::ReentrantInterrupt(kind.name()));
    }
    let handler = kernel.vector.handlers[kind.index()]
        .ok_or(KernelError::UnregisteredInterrupt(kind.name()))?;

    debug!("handling {} interrupt", kind.name());
    kernel.vector.handling = Some(kind);
    let result = handler(kernel, irq);
    kernel.vector.handling = None;
    result
}

fn wrong_kind(kind: IrqKind) -> KernelError {
    KernelError::UnregisteredInterrupt(kind.name())
}

fn new_handler(kernel: &mut Kernel, irq: Irq) -> KernelResult<()> {
    let kind = irq.kind();
    let Irq::New { path, priority } = irq else {
        return Err(wrong_kind(kind));
    };

    kernel.file_system.read(&path)?;

    let pid = kernel.pcb_table.new_pid();
    info!("new process {} for {} with priority {}", pid, path, priority);
    kernel.pcb_table.add(ProcessControlBlock::new(pid, path, priority));

    kernel.admit(pid)
}

fn kill_handler(kernel: &mut Kernel, _irq: Irq) -> KernelResult<()> {
    let pid = kernel.pcb_table.running_pid().ok_or(KernelError::NoRunningProcess)?;
    info!("process {} finished", pid);

    let pcb = kernel.pcb_table.get_mut(pid)?;
    Dispatcher::save(pcb, &mut kernel.hardware)?;
    pcb.set_state(ProcessState::Terminated)?;
    let frames = pcb.take_frames();

    kernel.memory_manager.release_process(pid, frames);
    kernel.pcb_table.set_running(None);
    kernel.hardware.mmu.reset_tlb();

    kernel.advance_ready()
}

fn io_in_handler(kernel: &mut Kernel, irq: Irq) -> KernelResult<()> {
    let kind = irq.kind();
    let Irq::IoIn(operation) = irq else {
        return Err(wrong_kind(kind));
    };
    let pid = kernel.pcb_table.running_pid().ok_or(KernelError::NoRunningProcess)?;

    let pcb = kernel.pcb_table.get_mut(pid)?;
    Dispatcher::save(pcb, &mut kernel.hardware)?;
    pcb.set_state(ProcessState::Waiting)?;
    kernel.pcb_table.set_running(None);

    kernel
        .io_controller
        .submit(pid, operation, &mut kernel.hardware.io_device);

    kernel.advance_ready()
}

fn io_out_handler(kernel: &mut Kernel, _irq: Irq) -> KernelResult<()> {
    let pid = kernel
        .io_controller
        .collect_finished(&mut kernel.hardware.io_device)
        .ok_or(KernelError::NoFinishedIo)?;
    info!("I/O finished for process {}", pid);

    kernel.admit(pid)
}

fn timeout_handler(kernel: &mut Kernel, _irq: Irq) -> KernelResult<()> {
    kernel.hardware.timer.reset();

    if kernel.scheduler.is_empty() {
        return Ok(());
    }
    match kernel.scheduler.schedule_next() {
        Some(next) => kernel.context_switch(next),
        None => Ok(()),
    }
}

fn page_fault_handler(kernel: &mut Kernel, irq: Irq) -> KernelResult<()> {
    let kind = irq.kind();
    let Irq::PageFault { page } = irq else {
        return Err(wrong_kind(kind));
    };
    let pid = kernel.pcb_table.running_pid().ok_or(KernelError::NoRunningProcess)?;

    let allocation = Loader::load_page(
        pid,
        page,
        &mut kernel.pcb_table,
        &mut kernel.memory_manager,
        &kernel.file_system,
        &mut kernel.hardware.memory,
    )?;

    // The victim may be another page of the running process.
    if let Some((victim_pid, victim_page)) = allocation.evicted {
        if victim_pid == pid {
            kernel.hardware.mmu.remove_page(victim_page);
        }
    }
    kernel.hardware.mmu.set_page_frame(page, allocation.frame);
    Ok(())
}

fn stat_handler(kernel: &mut Kernel, _irq: Irq) -> KernelResult<()> {
    let ready_queue = kernel.scheduler.ready_queue();
    let tick = kernel.hardware.current_tick();
    kernel.reporter.report(&kernel.pcb_table, &ready_queue, tick);
    Ok(())
}
