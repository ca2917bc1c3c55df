use std::collections::HashMap;

use tracing::debug;

use super::{Instruction, Program};

use crate::error::{KernelError, KernelResult};

/// Path-keyed store of compiled programs.
#[derive(Debug, Default)]
pub struct FileSystem {
    files: HashMap<String, Program>,
}

impl FileSystem {
    pub fn new() -> FileSystem {
        FileSystem {
            files: HashMap::new(),
        }
    }

    /// Stores `program` under `path`, replacing whatever was there.
    pub fn write(&mut self, path: impl Into<String>, program: Program) {
        let path = path.into();
        debug!("writing file {} with {}", path, program.name());
        self.files.insert(path, program);
    }

    pub fn read(&self, path: &str) -> KernelResult<&Program> {
        match self.files.get(path) {
            Some(program) => Ok(program),
            None => Err(KernelError::FileNotFound(path.to_string())),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Returns the `page`-th slice of `frame_size` instructions. The last page
    /// of a program may come back shorter than `frame_size`.
    pub fn read_range(
        &self,
        path: &str,
        page: usize,
        frame_size: usize,
    ) -> KernelResult<&[Instruction]> {
        let instructions = self.read(path)?.instructions();

        let first = page * frame_size;
        if first >= instructions.len() {
            return Err(KernelError::PageOutOfRange {
                path: path.to_string(),
                page,
            });
        }
        let last = (first + frame_size).min(instructions.len());

        debug!("reading from path: {}, instructions {}..{}", path, first, last);
        Ok(&instructions[first..last])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Asm;

    fn file_system_with(path: &str, cpu: usize) -> FileSystem {
        let mut fs = FileSystem::new();
        fs.write(path, Program::new(path, [Asm::cpu(cpu)]).unwrap());
        fs
    }

    #[test]
    fn test_file_system_write_then_read() {
        let fs = file_system_with("c:/prg.exe", 2);
        let program = fs.read("c:/prg.exe").unwrap();
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn test_file_system_overwrite() {
        let mut fs = file_system_with("c:/prg.exe", 2);
        fs.write("c:/prg.exe", Program::new("other", [Asm::cpu(5)]).unwrap());
        assert_eq!(fs.read("c:/prg.exe").unwrap().name(), "other");
    }

    #[test]
    fn test_file_system_read_missing() {
        let fs = FileSystem::new();
        assert!(matches!(fs.read("c:/none.exe"), Err(KernelError::FileNotFound(_))));
    }

    #[test]
    fn test_file_system_read_range() {
        let fs = file_system_with("c:/prg.exe", 5);
        assert_eq!(fs.read_range("c:/prg.exe", 0, 4).unwrap().len(), 4);
        assert_eq!(
            fs.read_range("c:/prg.exe", 1, 4).unwrap(),
            &[Instruction::Cpu, Instruction::Exit]
        );
    }

    #[test]
    fn test_file_system_read_range_past_end() {
        let fs = file_system_with("c:/prg.exe", 3);
        let result = fs.read_range("c:/prg.exe", 1, 4);
        assert!(matches!(result, Err(KernelError::PageOutOfRange { page: 1, .. })));
    }
}
