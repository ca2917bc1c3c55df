//! Frame pool, swap area and page replacement.
//!
//! A `(pid, page)` pair is either resident in exactly one frame (and then
//! present in both the owner's page table and the replacement policy's
//! bookkeeping) or stored in swap, never both.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use super::{PcbTable, Pid};

use crate::error::{KernelError, KernelResult};
use crate::hardware::Memory;
use crate::io::Instruction;

/// A resident page chosen for eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victim {
    pub pid: Pid,
    pub page: usize,
    pub frame: usize,
}

/// Chooses which resident page to evict when the frame pool is exhausted.
pub trait ReplacementPolicy {
    /// Called on every fault-in.
    fn record_new_frame(&mut self, pid: Pid, page: usize, frame: usize);

    /// Picks a victim and drops it from the policy's bookkeeping.
    fn select_victim(&mut self) -> Option<Victim>;

    /// Drops every page of a process that released its frames.
    fn forget_process(&mut self, pid: Pid);
}

/// Global FIFO across all processes: the longest-resident page goes first.
#[derive(Debug, Default)]
pub struct FifoReplacement {
    resident: VecDeque<Victim>,
}

impl FifoReplacement {
    pub fn new() -> FifoReplacement {
        FifoReplacement {
            resident: VecDeque::new(),
        }
    }
}

impl ReplacementPolicy for FifoReplacement {
    fn record_new_frame(&mut self, pid: Pid, page: usize, frame: usize) {
        self.resident.push_back(Victim { pid, page, frame });
    }

    fn select_victim(&mut self) -> Option<Victim> {
        self.resident.pop_front()
    }

    fn forget_process(&mut self, pid: Pid) {
        self.resident.retain(|victim| victim.pid != pid);
    }
}

#[derive(Debug, Clone)]
struct SwapEntry {
    pid: Pid,
    page: usize,
    data: Vec<Instruction>,
}

/// Result of a frame allocation. `evicted` names the page that was pushed to
/// swap to make room, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub frame: usize,
    pub evicted: Option<(Pid, usize)>,
}

pub struct MemoryManager {
    frame_size: usize,
    total_frames: usize,
    free_frames: VecDeque<usize>,
    swap: Vec<SwapEntry>,
    swap_capacity: usize,
    policy: Box<dyn ReplacementPolicy>,
}

impl MemoryManager {
    pub fn new(
        memory_size: usize,
        frame_size: usize,
        swap_capacity: usize,
        policy: Box<dyn ReplacementPolicy>,
    ) -> MemoryManager {
        let total_frames = memory_size / frame_size;

        MemoryManager {
            frame_size,
            total_frames,
            free_frames: (0..total_frames).collect(),
            swap: Vec::new(),
            swap_capacity,
            policy,
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_frames.len()
    }

    pub fn free_frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.free_frames.iter().copied()
    }

    pub fn swap_len(&self) -> usize {
        self.swap.len()
    }

    pub fn swap_capacity(&self) -> usize {
        self.swap_capacity
    }

    /// Hands out a free frame, evicting the policy's victim to swap when the
    /// pool is empty.
    pub fn allocate_frame(
        &mut self,
        memory: &Memory,
        pcbs: &mut PcbTable,
    ) -> KernelResult<Allocation> {
        if let Some(frame) = self.free_frames.pop_front() {
            debug!("allocated frame {}, free frames {:?}", frame, self.free_frames);
            return Ok(Allocation { frame, evicted: None });
        }

        if self.swap.len() >= self.swap_capacity {
            warn!("no free frames and swap is full ({} pages)", self.swap_capacity);
            return Err(self.memory_full());
        }
        let victim = self.policy.select_victim().ok_or_else(|| self.memory_full())?;

        let base = victim.frame * self.frame_size;
        let data = memory.read_block_from(base, base + self.frame_size)?;
        self.swap.push(SwapEntry {
            pid: victim.pid,
            page: victim.page,
            data,
        });
        pcbs.get_mut(victim.pid)?.unmap_page(victim.page);

        info!(
            "swapped out page {} of process {} from frame {} ({}/{} swap pages used)",
            victim.page,
            victim.pid,
            victim.frame,
            self.swap.len(),
            self.swap_capacity
        );

        Ok(Allocation {
            frame: victim.frame,
            evicted: Some((victim.pid, victim.page)),
        })
    }

    /// Returns frames straight to the pool. Never touches swap.
    pub fn free_frames_batch(&mut self, frames: impl IntoIterator<Item = usize>) {
        for frame in frames {
            self.free_frames.push_front(frame);
        }
        debug!("free frames {:?}", self.free_frames);
    }

    /// Releases a terminated process: its frames go back to the pool and its
    /// swapped-out pages are discarded.
    pub fn release_process(&mut self, pid: Pid, frames: Vec<usize>) {
        self.policy.forget_process(pid);
        self.swap.retain(|entry| entry.pid != pid);
        self.free_frames_batch(frames);
    }

    pub fn record_new_frame(&mut self, pid: Pid, page: usize, frame: usize) {
        self.policy.record_new_frame(pid, page, frame);
    }

    pub fn is_in_swap(&self, pid: Pid, page: usize) -> bool {
        self.swap.iter().any(|entry| entry.pid == pid && entry.page == page)
    }

    pub fn read_and_remove_from_swap(
        &mut self,
        pid: Pid,
        page: usize,
    ) -> KernelResult<Vec<Instruction>> {
        let position = self
            .swap
            .iter()
            .position(|entry| entry.pid == pid && entry.page == page)
            .ok_or(KernelError::NotInSwap { pid, page })?;

        debug!("swapped in page {} of process {}", page, pid);
        Ok(self.swap.remove(position).data)
    }

    fn memory_full(&self) -> KernelError {
        KernelError::MemoryFull {
            swap_used: self.swap.len(),
            swap_capacity: self.swap_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::ProcessControlBlock;

    const FRAME_SIZE: usize = 2;

    fn setup(frames: usize, swap: usize) -> (MemoryManager, Memory, PcbTable) {
        let mm = MemoryManager::new(
            frames * FRAME_SIZE,
            FRAME_SIZE,
            swap,
            Box::new(FifoReplacement::new()),
        );
        let memory = Memory::new(frames * FRAME_SIZE);
        let mut pcbs = PcbTable::new();
        for pid in 0..3 {
            pcbs.add(ProcessControlBlock::new(pid, format!("c:/prog{pid}.exe"), 1));
        }
        (mm, memory, pcbs)
    }

    fn fault_in(
        mm: &mut MemoryManager,
        memory: &mut Memory,
        pcbs: &mut PcbTable,
        pid: Pid,
        page: usize,
    ) -> Allocation {
        let allocation = mm.allocate_frame(memory, pcbs).unwrap();
        memory
            .write_block_to(allocation.frame * FRAME_SIZE, &[Instruction::Cpu; FRAME_SIZE])
            .unwrap();
        pcbs.get_mut(pid).unwrap().map_page(page, allocation.frame);
        mm.record_new_frame(pid, page, allocation.frame);
        allocation
    }

    fn mapped_frames(pcbs: &PcbTable) -> usize {
        pcbs.all().map(|pcb| pcb.page_table().len()).sum()
    }

    #[test]
    fn test_allocate_from_pool_in_order() {
        let (mut mm, memory, mut pcbs) = setup(3, 2);
        let frames: Vec<usize> = (0..3)
            .map(|_| mm.allocate_frame(&memory, &mut pcbs).unwrap().frame)
            .collect();
        assert_eq!(frames, vec![0, 1, 2]);
        assert_eq!(mm.free_frame_count(), 0);
    }

    #[test]
    fn test_fifo_evicts_longest_resident_across_processes() {
        let (mut mm, mut memory, mut pcbs) = setup(3, 4);

        fault_in(&mut mm, &mut memory, &mut pcbs, 0, 0);
        fault_in(&mut mm, &mut memory, &mut pcbs, 1, 0);
        fault_in(&mut mm, &mut memory, &mut pcbs, 0, 1);

        let first = fault_in(&mut mm, &mut memory, &mut pcbs, 2, 0);
        assert_eq!(first.evicted, Some((0, 0)));
        assert_eq!(first.frame, 0);

        let second = fault_in(&mut mm, &mut memory, &mut pcbs, 2, 1);
        assert_eq!(second.evicted, Some((1, 0)));

        let third = fault_in(&mut mm, &mut memory, &mut pcbs, 1, 1);
        assert_eq!(third.evicted, Some((0, 1)));

        assert!(pcbs.get(0).unwrap().page_table().is_empty());
        assert!(mm.is_in_swap(0, 0));
        assert!(mm.is_in_swap(1, 0));
        assert!(mm.is_in_swap(0, 1));
        assert_eq!(mm.free_frame_count() + mapped_frames(&pcbs), mm.total_frames());
    }

    #[test]
    fn test_page_is_resident_xor_swapped() {
        let (mut mm, mut memory, mut pcbs) = setup(1, 2);

        fault_in(&mut mm, &mut memory, &mut pcbs, 0, 0);
        fault_in(&mut mm, &mut memory, &mut pcbs, 1, 0);

        assert!(mm.is_in_swap(0, 0));
        assert!(!pcbs.get(0).unwrap().page_table().contains_key(&0));

        let data = mm.read_and_remove_from_swap(0, 0).unwrap();
        assert_eq!(data, vec![Instruction::Cpu; FRAME_SIZE]);
        assert!(!mm.is_in_swap(0, 0));
    }

    #[test]
    fn test_memory_full_when_swap_is_full() {
        let (mut mm, mut memory, mut pcbs) = setup(1, 1);

        fault_in(&mut mm, &mut memory, &mut pcbs, 0, 0);
        fault_in(&mut mm, &mut memory, &mut pcbs, 1, 0);

        let err = mm.allocate_frame(&memory, &mut pcbs).unwrap_err();
        assert!(err.is_capacity());
        assert_eq!(mapped_frames(&pcbs), 1);
    }

    #[test]
    fn test_read_from_swap_missing() {
        let (mut mm, _, _) = setup(1, 1);
        assert!(matches!(
            mm.read_and_remove_from_swap(2, 5),
            Err(KernelError::NotInSwap { pid: 2, page: 5 })
        ));
    }

    #[test]
    fn test_release_process_returns_frames_and_forgets_pages() {
        let (mut mm, mut memory, mut pcbs) = setup(2, 2);

        fault_in(&mut mm, &mut memory, &mut pcbs, 0, 0);
        fault_in(&mut mm, &mut memory, &mut pcbs, 1, 0);
        fault_in(&mut mm, &mut memory, &mut pcbs, 1, 1);
        assert!(mm.is_in_swap(0, 0));

        let frames = pcbs.get_mut(1).unwrap().take_frames();
        mm.release_process(1, frames);

        assert_eq!(mm.free_frame_count(), 2);
        assert_eq!(mm.swap_len(), 1);

        // Process 1's pages must never be chosen as victims again.
        fault_in(&mut mm, &mut memory, &mut pcbs, 2, 0);
        fault_in(&mut mm, &mut memory, &mut pcbs, 2, 1);
        let evicted = fault_in(&mut mm, &mut memory, &mut pcbs, 0, 0);
        assert_eq!(evicted.evicted, Some((2, 0)));
    }

    #[test]
    fn test_free_frames_never_touches_swap() {
        let (mut mm, mut memory, mut pcbs) = setup(1, 1);
        fault_in(&mut mm, &mut memory, &mut pcbs, 0, 0);
        fault_in(&mut mm, &mut memory, &mut pcbs, 1, 0);

        let frames = pcbs.get_mut(1).unwrap().take_frames();
        mm.free_frames_batch(frames);
        assert_eq!(mm.swap_len(), 1);
        assert_eq!(mm.free_frames().collect::<Vec<_>>(), vec![0]);
    }
}
