//! kernsim command line.
//!
//! Loads a program file, submits every job to a freshly booted kernel, runs
//! it to completion and prints the Gantt chart.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kernsim::io::load_program_file;
use kernsim::{Kernel, KernelResult, SchedulingAlgorithm, SimulatorConfig};

#[derive(Parser)]
#[command(name = "kernsim")]
#[command(version)]
#[command(about = "Interrupt-driven kernel simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the programs in a program file to completion
    Run {
        /// Program file with JOB ... END blocks
        #[arg(short, long, value_name = "FILE")]
        programs: PathBuf,

        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Scheduling policy, overrides the configuration
        #[arg(short, long, value_enum)]
        scheduler: Option<Policy>,

        /// Round robin quantum in ticks
        #[arg(short, long)]
        quantum: Option<u32>,

        /// Waiting ticks per priority level gained by aging
        #[arg(short, long)]
        aging: Option<u64>,

        /// Log level (error, warn, info, debug, trace)
        #[arg(short, long)]
        log_level: Option<String>,
    },
    /// Validate a configuration file and print it
    Check {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
    /// Print the default configuration
    DefaultConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    Fcfs,
    Priority,
    PreemptivePriority,
    RoundRobin,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            programs,
            config,
            scheduler,
            quantum,
            aging,
            log_level,
        } => load_config(config.as_deref())
            .map(|config| apply_overrides(config, scheduler, quantum, aging, log_level))
            .and_then(|config| {
                init_logging(&config.log_level);
                run(&config, &programs)
            }),
        Commands::Check { config } => check_config(&config),
        Commands::DefaultConfig => SimulatorConfig::default()
            .to_json()
            .map(|json| println!("{json}")),
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn load_config(path: Option<&Path>) -> KernelResult<SimulatorConfig> {
    match path {
        Some(path) => SimulatorConfig::load(path),
        None => Ok(SimulatorConfig::default()),
    }
}

fn apply_overrides(
    mut config: SimulatorConfig,
    policy: Option<Policy>,
    quantum: Option<u32>,
    aging: Option<u64>,
    log_level: Option<String>,
) -> SimulatorConfig {
    let current_aging = match config.scheduler {
        SchedulingAlgorithm::Priority { aging }
        | SchedulingAlgorithm::PreemptivePriority { aging } => aging,
        _ => None,
    };
    let aging = aging.or(current_aging);

    config.scheduler = match policy {
        Some(Policy::Fcfs) => SchedulingAlgorithm::Fcfs,
        Some(Policy::Priority) => SchedulingAlgorithm::Priority { aging },
        Some(Policy::PreemptivePriority) => SchedulingAlgorithm::PreemptivePriority { aging },
        Some(Policy::RoundRobin) => SchedulingAlgorithm::RoundRobin {
            quantum: quantum.or(config.scheduler.quantum()).unwrap_or(3),
        },
        None => match config.scheduler {
            SchedulingAlgorithm::RoundRobin { quantum: current } => {
                SchedulingAlgorithm::RoundRobin {
                    quantum: quantum.unwrap_or(current),
                }
            }
            SchedulingAlgorithm::Priority { .. } => SchedulingAlgorithm::Priority { aging },
            SchedulingAlgorithm::PreemptivePriority { .. } => {
                SchedulingAlgorithm::PreemptivePriority { aging }
            }
            SchedulingAlgorithm::Fcfs => SchedulingAlgorithm::Fcfs,
        },
    };

    if let Some(level) = log_level {
        config.log_level = level;
    }
    config
}

fn run(config: &SimulatorConfig, programs: &Path) -> KernelResult<()> {
    let mut kernel = Kernel::new(config)?;
    let jobs = load_program_file(programs, kernel.file_system_mut(), config.io_ticks)?;
    info!("Submitting {} jobs from {}", jobs.len(), programs.display());

    for job in jobs {
        if job.delay > 0 {
            kernel.run_with_delay(&job.path, job.priority, job.delay);
        } else {
            kernel.run(&job.path, job.priority)?;
        }
    }

    let ticks = kernel.run_to_completion()?;
    print_report(&kernel, ticks);
    if let Some(summary) = kernel.summary() {
        println!();
        println!("{summary}");
    }
    Ok(())
}

fn print_report(kernel: &Kernel, ticks: u64) {
    let memory = kernel.memory_manager();
    println!(
        "Finished after {ticks} ticks using {}",
        kernel.scheduler().algorithm()
    );
    println!("  processes: {}", kernel.pcb_table().len());
    println!(
        "  frames:    {} free of {}",
        memory.free_frame_count(),
        memory.total_frames()
    );
    println!(
        "  swap:      {} of {} pages in use",
        memory.swap_len(),
        memory.swap_capacity()
    );
}

fn check_config(path: &Path) -> KernelResult<()> {
    let config = SimulatorConfig::load(path)?;
    config.validate()?;

    println!("Configuration OK: {}", path.display());
    println!(
        "  memory:    {} cells, {} frames of {}",
        config.memory_size,
        config.frames(),
        config.frame_size
    );
    println!("  swap:      {} pages", config.swap_pages);
    println!("  scheduler: {}", config.scheduler);
    println!("  io ticks:  {}", config.io_ticks);
    println!("  stats:     {}", config.enable_stats);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_switch_policy() {
        let config = apply_overrides(
            SimulatorConfig::default(),
            Some(Policy::Priority),
            None,
            Some(4),
            None,
        );
        assert_eq!(config.scheduler, SchedulingAlgorithm::Priority { aging: Some(4) });
    }

    #[test]
    fn test_quantum_override_keeps_round_robin() {
        let config = apply_overrides(
            SimulatorConfig::default(),
            None,
            Some(7),
            None,
            Some("debug".into()),
        );
        assert_eq!(config.scheduler, SchedulingAlgorithm::RoundRobin { quantum: 7 });
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let base = SimulatorConfig::with_scheduler(SchedulingAlgorithm::PreemptivePriority {
            aging: Some(2),
        });
        let config = apply_overrides(base.clone(), None, None, None, None);
        assert_eq!(config, base);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "kernsim",
            "run",
            "--programs",
            "data/program_file.txt",
            "--scheduler",
            "fcfs",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Run { scheduler: Some(Policy::Fcfs), .. }));
    }
}
