use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Pid, ProcessControlBlock};

use crate::hardware::Tick;

/// Ready-queue policy. Lower priority values are more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SchedulingAlgorithm {
    Fcfs,
    /// `aging` is the number of waiting ticks that improve the effective
    /// priority by one.
    Priority { aging: Option<u64> },
    PreemptivePriority { aging: Option<u64> },
    RoundRobin { quantum: u32 },
}

impl SchedulingAlgorithm {
    /// Quantum the timer must enforce, if any.
    pub fn quantum(&self) -> Option<u32> {
        match self {
            SchedulingAlgorithm::RoundRobin { quantum } => Some(*quantum),
            _ => None,
        }
    }
}

impl fmt::Display for SchedulingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingAlgorithm::Fcfs => write!(f, "FCFS"),
            SchedulingAlgorithm::Priority { aging: None } => write!(f, "Priority"),
            SchedulingAlgorithm::Priority { aging: Some(ticks) } => {
                write!(f, "Priority (aging every {ticks} ticks)")
            }
            SchedulingAlgorithm::PreemptivePriority { aging: None } => {
                write!(f, "Preemptive Priority")
            }
            SchedulingAlgorithm::PreemptivePriority { aging: Some(ticks) } => {
                write!(f, "Preemptive Priority (aging every {ticks} ticks)")
            }
            SchedulingAlgorithm::RoundRobin { quantum } => {
                write!(f, "Round Robin (quantum {quantum})")
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReadyEntry {
    pid: Pid,
    priority: u32,
    enqueued_at: Tick,
}

pub struct ShortTermScheduler {
    ready_queue: VecDeque<ReadyEntry>,
    scheduling_alg: SchedulingAlgorithm,
}

impl ShortTermScheduler {
    pub fn new(scheduling_alg: SchedulingAlgorithm) -> ShortTermScheduler {
        ShortTermScheduler {
            ready_queue: VecDeque::new(),
            scheduling_alg,
        }
    }

    pub fn algorithm(&self) -> SchedulingAlgorithm {
        self.scheduling_alg
    }

    pub fn is_empty(&self) -> bool {
        self.ready_queue.is_empty()
    }

    /// Pids in dispatch order as of the last time the queue was touched.
    pub fn ready_queue(&self) -> Vec<Pid> {
        self.ready_queue.iter().map(|entry| entry.pid).collect()
    }

    pub fn schedule_process(&mut self, pcb: &ProcessControlBlock, now: Tick) {
        let entry = ReadyEntry {
            pid: pcb.get_id(),
            priority: pcb.get_priority(),
            enqueued_at: now,
        };

        match self.scheduling_alg {
            SchedulingAlgorithm::Fcfs | SchedulingAlgorithm::RoundRobin { .. } => {
                self.ready_queue.push_back(entry)
            }
            SchedulingAlgorithm::Priority { aging }
            | SchedulingAlgorithm::PreemptivePriority { aging } => {
                // Aging is only evaluated here, against the entries already queued.
                let arriving = entry.priority as i64;
                let position = self
                    .ready_queue
                    .iter()
                    .position(|queued| Self::effective_priority(queued, now, aging) > arriving)
                    .unwrap_or(self.ready_queue.len());
                self.ready_queue.insert(position, entry);
            }
        }

        debug!("ready queue: {:?}", self.ready_queue());
    }

    /// Callers check `is_empty` first.
    pub fn schedule_next(&mut self) -> Option<Pid> {
        self.ready_queue.pop_front().map(|entry| entry.pid)
    }

    /// Whether `arriving` takes the CPU from `running` on admission. Only
    /// the preemptive policy compares, and it uses base priorities.
    pub fn must_preempt(
        &self,
        running: &ProcessControlBlock,
        arriving: &ProcessControlBlock,
    ) -> bool {
        match self.scheduling_alg {
            SchedulingAlgorithm::PreemptivePriority { .. } => {
                running.get_priority() > arriving.get_priority()
            }
            _ => false,
        }
    }

    fn effective_priority(entry: &ReadyEntry, now: Tick, aging: Option<u64>) -> i64 {
        let base = entry.priority as i64;
        match aging {
            Some(interval) if interval > 0 => {
                let waited = now.saturating_sub(entry.enqueued_at);
                base - (waited / interval) as i64
            }
            _ => base,
        }
    }
}
