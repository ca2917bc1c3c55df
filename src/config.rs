//! Simulator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};
use crate::io::program::DEFAULT_IO_TICKS;
use crate::kernel::SchedulingAlgorithm;

/// Machine and kernel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Physical memory size in cells
    pub memory_size: usize,

    /// Cells per frame (and per page)
    pub frame_size: usize,

    /// Pages the swap area can hold
    pub swap_pages: usize,

    /// Ready-queue policy
    pub scheduler: SchedulingAlgorithm,

    /// Device time of an IO instruction without an explicit duration
    pub io_ticks: u32,

    /// Raise STAT after every tick
    pub enable_stats: bool,

    /// Logging level
    pub log_level: String,

    /// Upper bound for a full run
    pub max_ticks: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            memory_size: 16,
            frame_size: 4,
            swap_pages: 8,
            scheduler: SchedulingAlgorithm::RoundRobin { quantum: 3 },
            io_ticks: DEFAULT_IO_TICKS,
            enable_stats: true,
            log_level: "info".into(),
            max_ticks: 10_000,
        }
    }
}

impl SimulatorConfig {
    /// Default configuration with another scheduling policy
    pub fn with_scheduler(scheduler: SchedulingAlgorithm) -> Self {
        Self {
            scheduler,
            ..Self::default()
        }
    }

    /// Number of physical frames
    pub fn frames(&self) -> usize {
        self.memory_size / self.frame_size.max(1)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> KernelResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KernelError::InvalidConfiguration(e.to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| KernelError::InvalidConfiguration(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> KernelResult<()> {
        let content = self.to_json()?;

        std::fs::write(path, content)
            .map_err(|e| KernelError::InvalidConfiguration(e.to_string()))
    }

    pub fn to_json(&self) -> KernelResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| KernelError::InvalidConfiguration(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> KernelResult<()> {
        if self.frame_size == 0 {
            return Err(KernelError::InvalidConfiguration("frame_size must be positive".into()));
        }

        if self.memory_size < self.frame_size || self.memory_size % self.frame_size != 0 {
            return Err(KernelError::InvalidConfiguration(format!(
                "memory_size {} is not a positive multiple of frame_size {}",
                self.memory_size, self.frame_size
            )));
        }

        if self.swap_pages == 0 {
            return Err(KernelError::InvalidConfiguration("swap_pages must be positive".into()));
        }

        if self.io_ticks == 0 {
            return Err(KernelError::InvalidConfiguration("io_ticks must be positive".into()));
        }

        match self.scheduler {
            SchedulingAlgorithm::RoundRobin { quantum: 0 } => {
                return Err(KernelError::InvalidConfiguration("quantum must be positive".into()));
            }
            SchedulingAlgorithm::Priority { aging: Some(0) }
            | SchedulingAlgorithm::PreemptivePriority { aging: Some(0) } => {
                return Err(KernelError::InvalidConfiguration(
                    "aging interval must be positive".into(),
                ));
            }
            _ => {}
        }

        Ok(())
    }
}
