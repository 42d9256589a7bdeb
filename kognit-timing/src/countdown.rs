/// Per-second session clock. Holds no OS timer itself: the driver feeds it one
/// `tick` per elapsed second while it is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    budget_secs: u32,
    remaining_secs: u32,
    running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// Still running with this many seconds left.
    Running(u32),
    /// This tick consumed the last second.
    Expired,
    /// Not running; the tick was ignored.
    Idle,
}

impl Countdown {
    pub fn new(budget_secs: u32) -> Self {
        Self {
            budget_secs,
            remaining_secs: budget_secs,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.remaining_secs = self.budget_secs;
        self.running = self.budget_secs > 0;
    }

    pub fn tick(&mut self) -> TickResult {
        if !self.running {
            return TickResult::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.running = false;
            TickResult::Expired
        } else {
            TickResult::Running(self.remaining_secs)
        }
    }

    /// Releases the clock; later ticks are ignored.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn budget_secs(&self) -> u32 {
        self.budget_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
