//! Deterministic timeout source

use core::cell::Cell;

use hvrescue_core::timeout::TimeoutMonitor;

/// [`TimeoutMonitor`] that expires after a fixed number of polls
///
/// Simulated time does not advance while the engine spins on RDY/BSY, so a
/// wall clock deadline would make tests slow. This monitor counts calls to
/// [`timed_out`](TimeoutMonitor::timed_out) instead.
#[derive(Debug)]
pub struct PollTimeout {
    budget: u32,
    polls: Cell<u32>,
    expired: Cell<bool>,
    armed: bool,
    arms: u32,
}

impl PollTimeout {
    /// Expire after `budget` polls of an armed countdown
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            polls: Cell::new(0),
            expired: Cell::new(false),
            armed: false,
            arms: 0,
        }
    }

    /// Number of times the monitor has been armed
    pub fn arms(&self) -> u32 {
        self.arms
    }

    /// Returns true while a countdown is running
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Default for PollTimeout {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl TimeoutMonitor for PollTimeout {
    fn arm(&mut self, _deadline_ms: u32) {
        self.polls.set(0);
        self.expired.set(false);
        self.armed = true;
        self.arms += 1;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn timed_out(&self) -> bool {
        if self.armed {
            let polls = self.polls.get() + 1;
            self.polls.set(polls);
            if polls >= self.budget {
                self.expired.set(true);
            }
        }
        self.expired.get()
    }
}
