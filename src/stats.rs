//! STAT observers.
//!
//! The kernel hands every observer a view of the PCB table and the ready
//! queue once per tick. Observers never mutate kernel state.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::hardware::Tick;
use crate::kernel::{PcbTable, Pid, ProcessState};

pub trait Reporter {
    fn report(&mut self, table: &PcbTable, ready_queue: &[Pid], tick: Tick);

    /// Text summary of everything observed so far.
    fn summary(&self) -> Option<String> {
        None
    }
}

/// Per-process timing collected by [`GanttChart`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    /// Reported ticks spent alive but not on the CPU.
    pub waiting: u64,
    /// Reported ticks until the process was seen TERMINATED.
    pub turnaround: u64,
    pub finished: bool,
}

/// Gantt chart of CPU ownership and ready-queue contents, with waiting and
/// turnaround times per process.
#[derive(Debug, Default)]
pub struct GanttChart {
    ticks: Vec<Tick>,
    rows: BTreeMap<Pid, Vec<ProcessState>>,
    ready_queues: Vec<Vec<Pid>>,
    stats: BTreeMap<Pid, ProcessStats>,
}

impl GanttChart {
    pub fn new() -> GanttChart {
        GanttChart::default()
    }

    pub fn stats(&self) -> &BTreeMap<Pid, ProcessStats> {
        &self.stats
    }

    pub fn average_waiting(&self) -> f64 {
        Self::average(self.stats.values().map(|s| s.waiting))
    }

    pub fn average_turnaround(&self) -> f64 {
        Self::average(self.stats.values().map(|s| s.turnaround))
    }

    fn average(values: impl ExactSizeIterator<Item = u64>) -> f64 {
        let count = values.len();
        if count == 0 {
            return 0.0;
        }
        values.sum::<u64>() as f64 / count as f64
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let columns = self.ticks.len();

        let _ = write!(out, "|Process |");
        for tick in &self.ticks {
            let _ = write!(out, "{tick:^4}|");
        }
        out.push('\n');

        for (pid, history) in &self.rows {
            let _ = write!(out, "|{pid:>7} |");
            for _ in history.len()..columns {
                out.push_str("    |");
            }
            for state in history {
                let cell = match state {
                    ProcessState::Running => "CPU",
                    ProcessState::Waiting => "I/O",
                    ProcessState::Ready | ProcessState::New => " . ",
                    ProcessState::Terminated => "   ",
                };
                let _ = write!(out, "{cell:^4}|");
            }
            out.push('\n');
        }

        let depth = self.ready_queues.iter().map(Vec::len).max().unwrap_or(0);
        for position in 0..depth {
            let label = if position == 0 { "ReadyQ" } else { "" };
            let _ = write!(out, "|{label:<8}|");
            for queue in &self.ready_queues {
                match queue.get(position) {
                    Some(pid) => {
                        let _ = write!(out, "{pid:^4}|");
                    }
                    None => out.push_str("    |"),
                }
            }
            out.push('\n');
        }

        out.push('\n');
        out.push_str("| PID | Waiting | Turnaround |\n");
        out.push_str("|-----|---------|------------|\n");
        for (pid, stats) in &self.stats {
            let _ = writeln!(
                out,
                "| {:>3} | {:>7} | {:>10} |",
                pid, stats.waiting, stats.turnaround
            );
        }
        let _ = writeln!(
            out,
            "| avg | {:>7.2} | {:>10.2} |",
            self.average_waiting(),
            self.average_turnaround()
        );

        out
    }
}

impl Reporter for GanttChart {
    fn report(&mut self, table: &PcbTable, ready_queue: &[Pid], tick: Tick) {
        self.ticks.push(tick);
        self.ready_queues.push(ready_queue.to_vec());

        for pcb in table.all() {
            let state = pcb.get_state();
            self.rows.entry(pcb.get_id()).or_default().push(state);

            let stats = self.stats.entry(pcb.get_id()).or_default();
            if stats.finished {
                continue;
            }
            if state == ProcessState::Terminated {
                stats.finished = true;
                continue;
            }
            if state != ProcessState::Running {
                stats.waiting += 1;
            }
            stats.turnaround += 1;
        }
    }

    fn summary(&self) -> Option<String> {
        Some(self.render())
    }
}
