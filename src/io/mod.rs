pub mod file_system;
pub mod loader;
pub mod program;

pub use file_system::FileSystem;
pub use loader::{load_program_file, load_programs, Job};
pub use program::{Asm, Instruction, IoOperation, Program};
