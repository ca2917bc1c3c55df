use tracing::debug;

use super::ProcessControlBlock;

use crate::error::{KernelError, KernelResult};
use crate::hardware::Hardware;

/// Moves execution context between a PCB and the CPU/MMU.
pub struct Dispatcher {}

impl Dispatcher {
    /// Loads the PC and the whole page table into the hardware.
    pub fn load(pcb: &ProcessControlBlock, hardware: &mut Hardware) {
        debug!("loading process {} at PC={}", pcb.get_id(), pcb.program_counter);
        hardware.cpu.set_program_counter(Some(pcb.program_counter));
        hardware.mmu.reset_tlb();
        for (&page, &frame) in pcb.page_table() {
            hardware.mmu.set_page_frame(page, frame);
        }
    }

    /// Stores the CPU's PC in the PCB and leaves the CPU idle.
    pub fn save(pcb: &mut ProcessControlBlock, hardware: &mut Hardware) -> KernelResult<()> {
        let program_counter = hardware
            .cpu
            .program_counter()
            .ok_or(KernelError::NoRunningProcess)?;

        debug!("saving process {} at PC={}", pcb.get_id(), program_counter);
        pcb.program_counter = program_counter;
        hardware.cpu.set_program_counter(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatcher_load_then_save() {
        let mut hardware = Hardware::new(16, 4, None);
        hardware.mmu.set_page_frame(7, 0);

        let mut pcb = ProcessControlBlock::new(0, "c:/a.exe", 1);
        pcb.program_counter = 5;
        pcb.map_page(1, 2);

        Dispatcher::load(&pcb, &mut hardware);
        assert_eq!(hardware.cpu.program_counter(), Some(5));
        assert_eq!(hardware.mmu.frame_for(1), Some(2));
        assert_eq!(hardware.mmu.frame_for(7), None);

        hardware.cpu.set_program_counter(Some(6));
        Dispatcher::save(&mut pcb, &mut hardware).unwrap();
        assert_eq!(pcb.program_counter, 6);
        assert!(!hardware.cpu.is_busy());
    }

    #[test]
    fn test_dispatcher_save_idle_cpu() {
        let mut hardware = Hardware::new(16, 4, None);
        let mut pcb = ProcessControlBlock::new(0, "c:/a.exe", 1);
        assert!(matches!(
            Dispatcher::save(&mut pcb, &mut hardware),
            Err(KernelError::NoRunningProcess)
        ));
    }
}
