use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use super::{FileSystem, Instruction, IoOperation, Program};

use crate::error::{KernelError, KernelResult};

/// A program submission read from a JOB control card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub path: String,
    pub priority: u32,
    pub delay: u64,
}

pub fn load_program_file(
    path: &Path,
    fs: &mut FileSystem,
    io_ticks: u32,
) -> KernelResult<Vec<Job>> {
    let file = File::open(path)?;
    load_programs(BufReader::new(file), fs, io_ticks)
}

/// Reads every JOB ... END block, writes the programs into `fs` and returns
/// the submissions in file order.
pub fn load_programs<R: BufRead>(
    reader: R,
    fs: &mut FileSystem,
    io_ticks: u32,
) -> KernelResult<Vec<Job>> {
    let mut jobs = Vec::new();
    let mut current: Option<(Job, Vec<Instruction>)> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line_nr = idx + 1;
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(card) = line.strip_prefix("// JOB") {
            if current.is_some() {
                return Err(parse_error(line_nr, "JOB card before END of previous job"));
            }
            current = Some((parse_job(card, line_nr)?, Vec::new()));
        } else if line.starts_with("// END") {
            let (job, instructions) = current
                .take()
                .ok_or_else(|| parse_error(line_nr, "END card without JOB"))?;

            let program = Program::new(job.path.clone(), [instructions])
                .map_err(|err| parse_error(line_nr, &err.to_string()))?;
            info!("Loaded {} ({} instructions)", job.path, program.len());
            fs.write(job.path.clone(), program);
            jobs.push(job);
        } else {
            let (_, instructions) = current
                .as_mut()
                .ok_or_else(|| parse_error(line_nr, "instruction outside of a JOB"))?;
            instructions.extend(parse_instruction(line, line_nr, io_ticks)?);
        }
    }

    if current.is_some() {
        return Err(KernelError::ProgramFile {
            line: 0,
            reason: "missing END card at end of file".into(),
        });
    }

    Ok(jobs)
}

/// Longest CPU burst a single `CPU n` line may expand to.
pub const MAX_CPU_BURST: u32 = 4096;

/// Parses the JOB control card: `<path> <priority> [delay]`.
fn parse_job(control_card: &str, line_nr: usize) -> KernelResult<Job> {
    let inputs = &mut control_card.split_ascii_whitespace();

    let path = inputs
        .next()
        .ok_or_else(|| parse_error(line_nr, "JOB control card is missing value"))?
        .to_string();
    let priority = parse_number(inputs.next(), line_nr)?
        .ok_or_else(|| parse_error(line_nr, "JOB control card is missing value"))?;
    let delay = parse_number(inputs.next(), line_nr)?.unwrap_or(0);

    Ok(Job {
        path,
        priority: narrow("priority", priority, line_nr)?,
        delay,
    })
}

fn parse_instruction(
    line: &str,
    line_nr: usize,
    io_ticks: u32,
) -> KernelResult<Vec<Instruction>> {
    let mut inputs = line.split_ascii_whitespace();
    let mnemonic = inputs.next().unwrap_or_default().to_ascii_uppercase();
    let operand = parse_number(inputs.next(), line_nr)?;

    match mnemonic.as_str() {
        "CPU" => {
            let times: u32 = operand.map_or(Ok(1), |n| narrow("CPU count", n, line_nr))?;
            if times > MAX_CPU_BURST {
                return Err(parse_error(
                    line_nr,
                    &format!("CPU count {times} exceeds the maximum of {MAX_CPU_BURST}"),
                ));
            }
            Ok(vec![Instruction::Cpu; times as usize])
        }
        "IO" => {
            let ticks = operand.map_or(Ok(io_ticks), |n| narrow("IO ticks", n, line_nr))?;
            Ok(vec![Instruction::Io(IoOperation::new(ticks))])
        }
        "EXIT" => Ok(vec![Instruction::Exit]),
        _ => Err(parse_error(line_nr, &format!("unknown instruction {mnemonic}"))),
    }
}

fn parse_number(input: Option<&str>, line_nr: usize) -> KernelResult<Option<u64>> {
    input
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|err| parse_error(line_nr, &format!("{value} is not a number: {err}")))
        })
        .transpose()
}

fn narrow(field: &str, value: u64, line_nr: usize) -> KernelResult<u32> {
    u32::try_from(value)
        .map_err(|_| parse_error(line_nr, &format!("{field} {value} is out of range")))
}

fn parse_error(line: usize, reason: &str) -> KernelError {
    KernelError::ProgramFile {
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM_FILE: &str = "\
# three programs
// JOB c:/prog1.exe 1
CPU 2
IO
CPU 3
IO 5
CPU 2
// END

// JOB c:/prog2.exe 5 2
CPU 7
EXIT
// END
";

    #[test]
    fn test_load_programs_into_file_system() {
        let mut fs = FileSystem::new();
        let jobs = load_programs(PROGRAM_FILE.as_bytes(), &mut fs, 3).unwrap();

        assert_eq!(
            jobs,
            vec![
                Job { path: "c:/prog1.exe".into(), priority: 1, delay: 0 },
                Job { path: "c:/prog2.exe".into(), priority: 5, delay: 2 },
            ]
        );

        let prog1 = fs.read("c:/prog1.exe").unwrap();
        assert_eq!(prog1.len(), 10);
        assert_eq!(prog1.instructions()[2], Instruction::Io(IoOperation::new(3)));
        assert_eq!(prog1.instructions()[6], Instruction::Io(IoOperation::new(5)));

        let prog2 = fs.read("c:/prog2.exe").unwrap();
        assert_eq!(prog2.len(), 8);
    }

    #[test]
    fn test_parse_job_line() {
        let job = parse_job(" c:/a.exe 2 4", 1).unwrap();
        assert_eq!(job.path, "c:/a.exe");
        assert_eq!(job.priority, 2);
        assert_eq!(job.delay, 4);
    }

    #[test]
    fn test_missing_value() {
        let err = parse_job(" c:/a.exe", 7).unwrap_err();
        assert!(err.to_string().contains("missing value"));
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn test_invalid_value() {
        let err = parse_job(" c:/a.exe NOT_A_NUMBER", 1).unwrap_err();
        assert!(err.to_string().contains("is not a number"));
    }

    #[test]
    fn test_unknown_instruction() {
        let mut fs = FileSystem::new();
        let err = load_programs("// JOB a 1\nJMP 3\n// END\n".as_bytes(), &mut fs, 3).unwrap_err();
        assert!(matches!(err, KernelError::ProgramFile { line: 2, .. }));
    }

    #[test]
    fn test_missing_end_card() {
        let mut fs = FileSystem::new();
        let err = load_programs("// JOB a 1\nCPU\n".as_bytes(), &mut fs, 3).unwrap_err();
        assert!(err.to_string().contains("missing END"));
    }

    #[test]
    fn test_empty_job_is_rejected() {
        let mut fs = FileSystem::new();
        let err = load_programs("// JOB a 1\n// END\n".as_bytes(), &mut fs, 3).unwrap_err();
        assert!(matches!(err, KernelError::ProgramFile { line: 2, .. }));
        assert!(!fs.contains("a"));
    }

    #[test]
    fn test_priority_out_of_range() {
        let mut fs = FileSystem::new();
        let err = load_programs("// JOB a 4294967297\nCPU\n// END\n".as_bytes(), &mut fs, 3)
            .unwrap_err();
        assert!(matches!(err, KernelError::ProgramFile { line: 1, .. }));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_io_ticks_out_of_range() {
        let mut fs = FileSystem::new();
        let err = load_programs("// JOB a 1\nIO 4294967296\n// END\n".as_bytes(), &mut fs, 3)
            .unwrap_err();
        assert!(matches!(err, KernelError::ProgramFile { line: 2, .. }));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_huge_cpu_count_is_rejected() {
        let mut fs = FileSystem::new();
        let program = "// JOB a 1\nCPU 18446744073709551615\n// END\n";
        let err = load_programs(program.as_bytes(), &mut fs, 3).unwrap_err();
        assert!(matches!(err, KernelError::ProgramFile { line: 2, .. }));
        assert!(!fs.contains("a"));
    }

    #[test]
    fn test_cpu_count_above_burst_limit() {
        let mut fs = FileSystem::new();
        let program = format!("// JOB a 1\nCPU {}\n// END\n", MAX_CPU_BURST + 1);
        let err = load_programs(program.as_bytes(), &mut fs, 3).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"));

        let program = format!("// JOB a 1\nCPU {MAX_CPU_BURST}\n// END\n");
        load_programs(program.as_bytes(), &mut fs, 3).unwrap();
        assert_eq!(fs.read("a").unwrap().len(), MAX_CPU_BURST as usize + 1);
    }
}
