use crate::error::{KernelError, KernelResult};
use crate::io::Instruction;

/// Physical memory: one instruction word per cell.
pub struct Memory {
    data: Vec<Option<Instruction>>,
}

impl Memory {
    pub fn new(size: usize) -> Memory {
        Memory {
            data: vec![None; size],
        }
    }

    pub fn read_from(&self, address: usize) -> KernelResult<Instruction> {
        self.check_bounds(address, address + 1)?;
        self.data[address].ok_or(KernelError::UninitializedCell(address))
    }

    /// Reads the cells in `start_address..end_address`.
    pub fn read_block_from(
        &self,
        start_address: usize,
        end_address: usize,
    ) -> KernelResult<Vec<Instruction>> {
        self.check_bounds(start_address, end_address)?;

        (start_address..end_address)
            .map(|address| self.read_from(address))
            .collect()
    }

    pub fn write_to(&mut self, address: usize, value: Instruction) -> KernelResult<()> {
        self.check_bounds(address, address + 1)?;
        self.data[address] = Some(value);
        Ok(())
    }

    pub fn write_block_to(&mut self, address: usize, data: &[Instruction]) -> KernelResult<()> {
        let start_address = address;
        let end_address = address + data.len();
        self.check_bounds(start_address, end_address)?;

        for (cell, value) in self.data[start_address..end_address].iter_mut().zip(data) {
            *cell = Some(*value);
        }
        Ok(())
    }

    fn check_bounds(&self, start_address: usize, end_address: usize) -> KernelResult<()> {
        let size = self.data.len();
        if end_address > size || start_address > end_address {
            return Err(KernelError::AddressOutOfBounds {
                address: start_address.max(end_address.saturating_sub(1)),
                size,
            });
        }
        Ok(())
    }
}
