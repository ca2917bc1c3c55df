/// Monotonic simulation tick.
pub type Tick = u64;

#[derive(Debug, Default)]
pub struct Clock {
    current_tick: Tick,
}

impl Clock {
    pub fn new() -> Clock {
        Clock { current_tick: 0 }
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn advance(&mut self) {
        self.current_tick += 1;
    }
}

/// Quantum countdown. Inactive until a quantum is set.
#[derive(Debug, Default)]
pub struct Timer {
    tick_count: u32,
    quantum: Option<u32>,
}

impl Timer {
    pub fn new(quantum: Option<u32>) -> Timer {
        Timer {
            tick_count: 0,
            quantum,
        }
    }

    pub fn reset(&mut self) {
        self.tick_count = 0;
    }

    /// Counts one tick. Returns true when the quantum is used up and the
    /// running process must be timed out instead of executing.
    pub fn tick(&mut self, cpu_busy: bool) -> bool {
        self.tick_count += 1;

        match self.quantum {
            Some(quantum) => cpu_busy && self.tick_count > quantum,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_inactive_never_expires() {
        let mut timer = Timer::new(None);
        assert!((0..100).all(|_| !timer.tick(true)));
    }

    #[test]
    fn test_timer_expires_after_quantum() {
        let mut timer = Timer::new(Some(2));
        assert!(!timer.tick(true));
        assert!(!timer.tick(true));
        assert!(timer.tick(true));
        timer.reset();
        assert!(!timer.tick(true));
    }

    #[test]
    fn test_timer_idle_cpu_does_not_expire() {
        let mut timer = Timer::new(Some(1));
        timer.tick(false);
        assert!(!timer.tick(false));
    }

    #[test]
    fn test_clock_advance() {
        let mut clock = Clock::new();
        clock.advance();
        clock.advance();
        assert_eq!(clock.current_tick(), 2);
    }
}
