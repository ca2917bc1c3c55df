use tracing::debug;

use crate::io::IoOperation;

/// The single I/O device. Runs one operation at a time.
#[derive(Debug, Default)]
pub struct IoDevice {
    remaining_ticks: Option<u32>,
}

impl IoDevice {
    pub fn new() -> IoDevice {
        IoDevice {
            remaining_ticks: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.remaining_ticks.is_none()
    }

    /// Starts `operation`. The device must be idle.
    pub fn execute(&mut self, operation: IoOperation) {
        debug_assert!(self.is_idle(), "I/O device is busy");
        debug!("device - executing operation for {} ticks", operation.ticks);
        self.remaining_ticks = Some(operation.ticks.max(1));
    }

    /// Counts one tick. Returns true when the in-flight operation finishes on
    /// this tick.
    pub fn tick(&mut self) -> bool {
        match self.remaining_ticks {
            Some(1) => {
                self.remaining_ticks = None;
                true
            }
            Some(remaining) => {
                self.remaining_ticks = Some(remaining - 1);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_device_finishes_after_ticks() {
        let mut device = IoDevice::new();
        device.execute(IoOperation::new(3));
        assert!(!device.is_idle());
        assert!(!device.tick());
        assert!(!device.tick());
        assert!(device.tick());
        assert!(device.is_idle());
        assert!(!device.tick());
    }

    #[test]
    fn test_io_device_zero_ticks_takes_one() {
        let mut device = IoDevice::new();
        device.execute(IoOperation::new(0));
        assert!(device.tick());
    }
}
