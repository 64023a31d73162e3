//! Playback clock for image and text slides
//!
//! Time is a monotonic `Duration` supplied by the host on every call, so a
//! timer is just a deadline. Dropping a [`ClockTimer`] cancels it.

use std::time::Duration;

/// Armed advance timer for one slide activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockTimer {
    deadline: Duration,
}

impl ClockTimer {
    /// Arm a timer that fires `duration` after `now`
    pub fn arm(now: Duration, duration: Duration) -> Self {
        Self {
            deadline: now.saturating_add(duration),
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.deadline
    }
}
