use tracing::info;

use super::{Allocation, MemoryManager, PcbTable, Pid};

use crate::error::KernelResult;
use crate::hardware::Memory;
use crate::io::{FileSystem, Instruction};

/// Resolves page faults into freshly allocated frames.
pub struct Loader {}

impl Loader {
    /// Brings `page` of `pid` into memory, from swap if it was evicted or
    /// from the program file otherwise. A short last page is padded with
    /// EXIT so every frame cell holds a word.
    pub fn load_page(
        pid: Pid,
        page: usize,
        pcbs: &mut PcbTable,
        mm: &mut MemoryManager,
        fs: &FileSystem,
        memory: &mut Memory,
    ) -> KernelResult<Allocation> {
        let frame_size = mm.frame_size();

        let mut words = if mm.is_in_swap(pid, page) {
            mm.read_and_remove_from_swap(pid, page)?
        } else {
            let path = pcbs.get(pid)?.get_path();
            fs.read_range(path, page, frame_size)?.to_vec()
        };
        words.resize(frame_size, Instruction::Exit);

        let allocation = mm.allocate_frame(memory, pcbs)?;
        memory.write_block_to(allocation.frame * frame_size, &words)?;

        pcbs.get_mut(pid)?.map_page(page, allocation.frame);
        mm.record_new_frame(pid, page, allocation.frame);

        info!("page fault: process {} page {} -> frame {}", pid, page, allocation.frame);
        Ok(allocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;
    use crate::io::{Asm, Program};
    use crate::kernel::{FifoReplacement, ProcessControlBlock};

    fn setup(frames: usize) -> (PcbTable, MemoryManager, FileSystem, Memory) {
        let mut fs = FileSystem::new();
        fs.write("c:/a.exe", Program::new("a", [Asm::cpu(5)]).unwrap());
        fs.write("c:/b.exe", Program::new("b", [Asm::cpu(3), Asm::io()]).unwrap());

        let mut pcbs = PcbTable::new();
        pcbs.add(ProcessControlBlock::new(0, "c:/a.exe", 1));
        pcbs.add(ProcessControlBlock::new(1, "c:/b.exe", 1));

        let mm = MemoryManager::new(frames * 4, 4, 4, Box::new(FifoReplacement::new()));
        (pcbs, mm, fs, Memory::new(frames * 4))
    }

    #[test]
    fn test_load_page_from_file_system() {
        let (mut pcbs, mut mm, fs, mut memory) = setup(2);

        let allocation = Loader::load_page(0, 0, &mut pcbs, &mut mm, &fs, &mut memory).unwrap();
        assert_eq!(allocation.frame, 0);
        assert_eq!(memory.read_block_from(0, 4).unwrap(), vec![Instruction::Cpu; 4]);
        assert_eq!(pcbs.get(0).unwrap().page_table().get(&0), Some(&0));
    }

    #[test]
    fn test_load_short_last_page_is_padded() {
        let (mut pcbs, mut mm, fs, mut memory) = setup(2);

        let allocation = Loader::load_page(0, 1, &mut pcbs, &mut mm, &fs, &mut memory).unwrap();
        let base = allocation.frame * 4;
        assert_eq!(
            memory.read_block_from(base, base + 4).unwrap(),
            vec![Instruction::Cpu, Instruction::Exit, Instruction::Exit, Instruction::Exit]
        );
    }

    #[test]
    fn test_load_page_past_end() {
        let (mut pcbs, mut mm, fs, mut memory) = setup(2);
        let result = Loader::load_page(0, 2, &mut pcbs, &mut mm, &fs, &mut memory);
        assert!(matches!(result, Err(KernelError::PageOutOfRange { page: 2, .. })));
        assert_eq!(mm.free_frame_count(), 2);
    }

    #[test]
    fn test_evicted_page_comes_back_from_swap() {
        let (mut pcbs, mut mm, fs, mut memory) = setup(1);

        Loader::load_page(1, 0, &mut pcbs, &mut mm, &fs, &mut memory).unwrap();
        let allocation = Loader::load_page(0, 0, &mut pcbs, &mut mm, &fs, &mut memory).unwrap();
        assert_eq!(allocation.evicted, Some((1, 0)));
        assert!(mm.is_in_swap(1, 0));

        let allocation = Loader::load_page(1, 0, &mut pcbs, &mut mm, &fs, &mut memory).unwrap();
        assert_eq!(allocation.evicted, Some((0, 0)));
        assert!(!mm.is_in_swap(1, 0));
        assert!(mm.is_in_swap(0, 0));
        assert_eq!(
            memory.read_block_from(0, 4).unwrap(),
            vec![
                Instruction::Cpu,
                Instruction::Cpu,
                Instruction::Cpu,
                Instruction::Io(Default::default()),
            ]
        );
    }
}
