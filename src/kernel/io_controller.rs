use std::collections::VecDeque;

use tracing::info;

use super::Pid;

use crate::hardware::IoDevice;
use crate::io::IoOperation;

/// Serializes operations against the single I/O device. The waiting
/// process's context lives in its PCB, so only the pid is queued.
#[derive(Debug, Default)]
pub struct IoDeviceController {
    waiting_queue: VecDeque<(Pid, IoOperation)>,
    current: Option<Pid>,
}

impl IoDeviceController {
    pub fn new() -> IoDeviceController {
        IoDeviceController {
            waiting_queue: VecDeque::new(),
            current: None,
        }
    }

    pub fn submit(&mut self, pid: Pid, operation: IoOperation, device: &mut IoDevice) {
        self.waiting_queue.push_back((pid, operation));
        self.start_next_if_idle(device);
        info!("{}", self.describe());
    }

    /// Returns the process whose operation just finished and starts the next
    /// queued one.
    pub fn collect_finished(&mut self, device: &mut IoDevice) -> Option<Pid> {
        let finished = self.current.take();
        self.start_next_if_idle(device);
        finished
    }

    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    pub fn waiting(&self) -> Vec<Pid> {
        self.waiting_queue.iter().map(|(pid, _)| *pid).collect()
    }

    fn start_next_if_idle(&mut self, device: &mut IoDevice) {
        if self.current.is_some() || !device.is_idle() {
            return;
        }

        if let Some((pid, operation)) = self.waiting_queue.pop_front() {
            self.current = Some(pid);
            device.execute(operation);
        }
    }

    fn describe(&self) -> String {
        format!(
            "IoDeviceController running: {:?} waiting: {:?}",
            self.current,
            self.waiting()
        )
    }
}
