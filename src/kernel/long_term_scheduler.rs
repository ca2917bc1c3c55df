use std::collections::VecDeque;

use crate::hardware::Tick;

/// A program waiting to be submitted as a NEW interrupt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub path: String,
    pub priority: u32,
    pub due: Tick,
}

/// Holds delayed submissions until their tick comes.
#[derive(Debug, Default)]
pub struct LongTermScheduler {
    program_queue: VecDeque<Submission>,
}

impl LongTermScheduler {
    pub fn new() -> LongTermScheduler {
        LongTermScheduler {
            program_queue: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, path: impl Into<String>, priority: u32, due: Tick) {
        self.program_queue.push_back(Submission {
            path: path.into(),
            priority,
            due,
        });
    }

    pub fn has_programs(&self) -> bool {
        !self.program_queue.is_empty()
    }

    /// Removes and returns the earliest-submitted entry due at or before
    /// `now`. Later entries stay queued until they are taken.
    pub fn next_due(&mut self, now: Tick) -> Option<Submission> {
        let position = self
            .program_queue
            .iter()
            .position(|submission| submission.due <= now)?;
        self.program_queue.remove(position)
    }
}
