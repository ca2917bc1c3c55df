use std::collections::HashMap;

/// Address translation for the running process.
pub struct Mmu {
    frame_size: usize,
    tlb: HashMap<usize, usize>,
}

impl Mmu {
    pub fn new(frame_size: usize) -> Mmu {
        Mmu {
            frame_size,
            tlb: HashMap::new(),
        }
    }

    pub fn reset_tlb(&mut self) {
        self.tlb.clear();
    }

    pub fn set_page_frame(&mut self, page: usize, frame: usize) {
        self.tlb.insert(page, frame);
    }

    pub fn remove_page(&mut self, page: usize) {
        self.tlb.remove(&page);
    }

    pub fn frame_for(&self, page: usize) -> Option<usize> {
        self.tlb.get(&page).copied()
    }

    /// Maps a logical address to a physical one. `Err` carries the faulting
    /// virtual page.
    pub fn translate(&self, logical_address: usize) -> Result<usize, usize> {
        let page = logical_address / self.frame_size;
        let offset = logical_address % self.frame_size;

        match self.tlb.get(&page) {
            Some(frame) => Ok(frame * self.frame_size + offset),
            None => Err(page),
        }
    }
}
