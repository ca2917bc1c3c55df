use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{KernelError, KernelResult};

pub type Pid = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Waiting,
    Terminated,
}

impl ProcessState {
    pub const ALL: [ProcessState; 5] = [
        ProcessState::New,
        ProcessState::Ready,
        ProcessState::Running,
        ProcessState::Waiting,
        ProcessState::Terminated,
    ];

    /// The process life-cycle edges. TERMINATED is absorbing.
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;

        matches!(
            (self, next),
            (New, Ready)
                | (New, Running)
                | (Ready, Running)
                | (Running, Ready)
                | (Running, Waiting)
                | (Running, Terminated)
                | (Waiting, Ready)
                | (Waiting, Running)
        )
    }
}

#[derive(Debug, Clone)]
pub struct ProcessControlBlock {
    pub program_counter: usize,

    id: Pid,
    priority: u32,
    path: String,
    state: ProcessState,
    page_table: BTreeMap<usize, usize>,
}

impl ProcessControlBlock {
    pub fn new(id: Pid, path: impl Into<String>, priority: u32) -> ProcessControlBlock {
        ProcessControlBlock {
            id,
            priority,
            path: path.into(),
            state: ProcessState::New,
            page_table: BTreeMap::new(),
            program_counter: 0,
        }
    }

    pub fn get_id(&self) -> Pid {
        self.id
    }

    pub fn get_priority(&self) -> u32 {
        self.priority
    }

    pub fn get_path(&self) -> &str {
        &self.path
    }

    pub fn get_state(&self) -> ProcessState {
        self.state
    }

    pub fn set_state(&mut self, next: ProcessState) -> KernelResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(KernelError::IllegalTransition {
                pid: self.id,
                from: self.state,
                to: next,
            });
        }

        debug!("process {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Resident pages only: virtual page -> physical frame.
    pub fn page_table(&self) -> &BTreeMap<usize, usize> {
        &self.page_table
    }

    pub fn map_page(&mut self, page: usize, frame: usize) {
        self.page_table.insert(page, frame);
    }

    pub fn unmap_page(&mut self, page: usize) -> Option<usize> {
        self.page_table.remove(&page)
    }

    /// Empties the page table and returns the frames it held.
    pub fn take_frames(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.page_table).into_values().collect()
    }
}

/// Owns every PCB and tracks the running one.
#[derive(Debug, Default)]
pub struct PcbTable {
    pcbs: BTreeMap<Pid, ProcessControlBlock>,
    running: Option<Pid>,
    next_pid: Pid,
}

impl PcbTable {
    pub fn new() -> PcbTable {
        PcbTable {
            pcbs: BTreeMap::new(),
            running: None,
            next_pid: 0,
        }
    }

    pub fn new_pid(&mut self) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    pub fn add(&mut self, pcb: ProcessControlBlock) {
        self.pcbs.insert(pcb.get_id(), pcb);
    }

    pub fn get(&self, pid: Pid) -> KernelResult<&ProcessControlBlock> {
        self.pcbs.get(&pid).ok_or(KernelError::UnknownPid(pid))
    }

    pub fn get_mut(&mut self, pid: Pid) -> KernelResult<&mut ProcessControlBlock> {
        self.pcbs.get_mut(&pid).ok_or(KernelError::UnknownPid(pid))
    }

    pub fn running_pid(&self) -> Option<Pid> {
        self.running
    }

    pub fn set_running(&mut self, pid: Option<Pid>) {
        self.running = pid;
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn all(&self) -> impl Iterator<Item = &ProcessControlBlock> {
        self.pcbs.values()
    }

    pub fn len(&self) -> usize {
        self.pcbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcbs.is_empty()
    }

    pub fn count_in(&self, state: ProcessState) -> usize {
        self.pcbs.values().filter(|pcb| pcb.get_state() == state).count()
    }

    /// True once every process has terminated.
    pub fn all_terminated(&self) -> bool {
        self.pcbs
            .values()
            .all(|pcb| pcb.get_state() == ProcessState::Terminated)
    }
}
